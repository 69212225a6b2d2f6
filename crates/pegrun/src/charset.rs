//! Character sets for character transitions.

use std::fmt;

/// A set of characters built from single code points and inclusive ranges.
///
/// Code points below 256 live in a bitmap; the rest in a sorted, merged
/// range table probed by binary search, so membership stays cheap for both
/// ASCII-heavy grammars and wide Unicode classes.
#[derive(Clone)]
pub struct CharSet {
    bitmap: [u64; 4],
    /// Ranges of code points at or above 256, sorted and non-overlapping.
    wide: Vec<(u32, u32)>,
}

impl CharSet {
    pub fn new(singles: &[char], ranges: &[(char, char)]) -> Self {
        let mut set = Self { bitmap: [0; 4], wide: Vec::new() };
        for &c in singles {
            set.add_range(c, c);
        }
        for &(lo, hi) in ranges {
            set.add_range(lo, hi);
        }
        set.normalize();
        set
    }

    /// Set containing exactly the given characters.
    pub fn of(singles: &[char]) -> Self {
        Self::new(singles, &[])
    }

    /// Set containing one inclusive range.
    pub fn range(lo: char, hi: char) -> Self {
        Self::new(&[], &[(lo, hi)])
    }

    fn add_range(&mut self, lo: char, hi: char) {
        let (lo, hi) = if lo <= hi { (lo as u32, hi as u32) } else { (hi as u32, lo as u32) };
        let mut c = lo;
        while c <= hi.min(255) {
            self.bitmap[(c / 64) as usize] |= 1 << (c % 64);
            c += 1;
        }
        if hi >= 256 {
            self.wide.push((lo.max(256), hi));
        }
    }

    fn normalize(&mut self) {
        self.wide.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.wide.len());
        for &(lo, hi) in &self.wide {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        self.wide = merged;
    }

    /// Membership test.
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        let cp = c as u32;
        if cp < 256 {
            self.bitmap[(cp / 64) as usize] & (1 << (cp % 64)) != 0
        } else {
            self.wide
                .binary_search_by(|&(lo, hi)| {
                    if hi < cp {
                        std::cmp::Ordering::Less
                    } else if lo > cp {
                        std::cmp::Ordering::Greater
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
                .is_ok()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.iter().all(|&word| word == 0) && self.wide.is_empty()
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut shown = 0;
        for cp in 0u32..256 {
            if self.bitmap[(cp / 64) as usize] & (1 << (cp % 64)) == 0 {
                continue;
            }
            if shown == 40 {
                write!(f, "...")?;
                break;
            }
            let c = char::from_u32(cp).unwrap_or('\u{fffd}');
            if c.is_ascii_graphic() {
                write!(f, "{}", c)?;
            } else {
                write!(f, "\\x{:02x}", cp)?;
            }
            shown += 1;
        }
        for &(lo, hi) in &self.wide {
            write!(f, "\\u{{{:x}}}-\\u{{{:x}}}", lo, hi)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singles_and_ranges() {
        let set = CharSet::new(&['_'], &[('a', 'c'), ('0', '9')]);
        assert!(set.matches('_'));
        assert!(set.matches('a'));
        assert!(set.matches('c'));
        assert!(set.matches('7'));
        assert!(!set.matches('d'));
        assert!(!set.matches(' '));
    }

    #[test]
    fn reversed_range_is_reordered() {
        let set = CharSet::range('z', 'x');
        assert!(set.matches('y'));
        assert!(!set.matches('w'));
    }

    #[test]
    fn wide_code_points() {
        let set = CharSet::new(&['\u{3042}'], &[('\u{1F600}', '\u{1F64F}')]);
        assert!(set.matches('\u{3042}'));
        assert!(set.matches('\u{1F610}'));
        assert!(!set.matches('\u{3043}'));
        assert!(!set.matches('a'));
    }

    #[test]
    fn range_straddling_the_bitmap_boundary() {
        let set = CharSet::range('\u{f0}', '\u{130}');
        assert!(set.matches('\u{f0}'));
        assert!(set.matches('\u{ff}'));
        assert!(set.matches('\u{100}'));
        assert!(set.matches('\u{130}'));
        assert!(!set.matches('\u{131}'));
        assert!(!set.matches('\u{ef}'));
    }

    #[test]
    fn overlapping_wide_ranges_merge() {
        let set = CharSet::new(&[], &[('\u{300}', '\u{320}'), ('\u{310}', '\u{330}')]);
        assert!(set.matches('\u{325}'));
        assert!(!set.matches('\u{331}'));
    }

    #[test]
    fn empty_set_matches_nothing() {
        let set = CharSet::of(&[]);
        assert!(set.is_empty());
        assert!(!set.matches('a'));
    }
}

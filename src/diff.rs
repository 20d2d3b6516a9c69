//! Character-level alignment of two field values.
//!
//! Alignment follows the classic longest-matching-block scheme: find the
//! longest common run, then recurse on the pieces to its left and right.
//! Characters that are very common in a long second sequence are not used to
//! start a match, which keeps the search fast and the output stable on long
//! passenger lists.

use std::collections::HashMap;

/// Below this length of the second sequence no element counts as popular.
const POPULAR_MIN_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// `a[a_start..a_end]` relates to `b[b_start..b_end]` as described by `tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: Tag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

/// `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    b_index: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T> SequenceMatcher<'a, T>
where
    T: Eq + std::hash::Hash,
{
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b_index: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, item) in b.iter().enumerate() {
            b_index.entry(item).or_default().push(j);
        }

        let n = b.len();
        if n >= POPULAR_MIN_LEN {
            let limit = n / 100 + 1;
            b_index.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b_index }
    }

    /// Longest run with `a_lo <= i`, `i + size <= a_hi`, `b_lo <= j`,
    /// `j + size <= b_hi`. Ties go to the earliest start in `a`, then in `b`.
    pub fn find_longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> Match {
        let mut best = Match {
            a: a_lo,
            b: b_lo,
            size: 0,
        };

        // run length of the match ending at b[j], for the previous row of a
        let mut run_len: HashMap<usize, usize> = HashMap::new();
        for i in a_lo..a_hi {
            let mut next_run_len = HashMap::new();
            if let Some(positions) = self.b_index.get(&self.a[i]) {
                for &j in positions {
                    if j < b_lo {
                        continue;
                    }
                    if j >= b_hi {
                        break;
                    }
                    let k = j.checked_sub(1).and_then(|p| run_len.get(&p)).copied().unwrap_or(0) + 1;
                    next_run_len.insert(j, k);
                    if k > best.size {
                        best = Match {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            run_len = next_run_len;
        }

        // Popular elements never seed a match but may still extend one.
        while best.a > a_lo && best.b > b_lo && self.a[best.a - 1] == self.b[best.b - 1] {
            best.a -= 1;
            best.b -= 1;
            best.size += 1;
        }
        while best.a + best.size < a_hi
            && best.b + best.size < b_hi
            && self.a[best.a + best.size] == self.b[best.b + best.size]
        {
            best.size += 1;
        }

        best
    }

    /// Non-overlapping, non-adjacent matches in increasing order, terminated
    /// by a zero-size match at `(a.len(), b.len())`.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (a_len, b_len) = (self.a.len(), self.b.len());

        let mut found = Vec::new();
        let mut pending = vec![(0, a_len, 0, b_len)];
        while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
            let m = self.find_longest_match(a_lo, a_hi, b_lo, b_hi);
            if m.size == 0 {
                continue;
            }
            found.push(m);
            if a_lo < m.a && b_lo < m.b {
                pending.push((a_lo, m.a, b_lo, m.b));
            }
            if m.a + m.size < a_hi && m.b + m.size < b_hi {
                pending.push((m.a + m.size, a_hi, m.b + m.size, b_hi));
            }
        }
        found.sort();

        let mut merged: Vec<Match> = Vec::with_capacity(found.len() + 1);
        for m in found {
            match merged.last_mut() {
                Some(last) if last.a + last.size == m.a && last.b + last.size == m.b => {
                    last.size += m.size;
                }
                _ => merged.push(m),
            }
        }
        merged.push(Match {
            a: a_len,
            b: b_len,
            size: 0,
        });
        merged
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);
        for m in self.matching_blocks() {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode {
                    tag,
                    a_start: i,
                    a_end: m.a,
                    b_start: j,
                    b_end: m.b,
                });
            }
            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                ops.push(Opcode {
                    tag: Tag::Equal,
                    a_start: m.a,
                    a_end: i,
                    b_start: m.b,
                    b_end: j,
                });
            }
        }
        ops
    }
}

/// Marks the characters that differ between `old` and `new` with square
/// brackets. Text the two share is copied to both sides unmarked.
pub fn highlight_diff(old: &str, new: &str) -> (String, String) {
    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();

    let mut marked_old = String::with_capacity(old.len() + 8);
    let mut marked_new = String::with_capacity(new.len() + 8);

    for op in SequenceMatcher::new(&a, &b).opcodes() {
        let a_part = &a[op.a_start..op.a_end];
        let b_part = &b[op.b_start..op.b_end];
        match op.tag {
            Tag::Equal => {
                marked_old.extend(a_part);
                marked_new.extend(b_part);
            }
            Tag::Replace => {
                bracket(&mut marked_old, a_part);
                bracket(&mut marked_new, b_part);
            }
            Tag::Delete => bracket(&mut marked_old, a_part),
            Tag::Insert => bracket(&mut marked_new, b_part),
        }
    }

    (marked_old, marked_new)
}

fn bracket(out: &mut String, chars: &[char]) {
    out.push('[');
    out.extend(chars);
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn ops(a: &str, b: &str) -> Vec<(Tag, usize, usize, usize, usize)> {
        let (a, b) = (chars(a), chars(b));
        SequenceMatcher::new(&a, &b)
            .opcodes()
            .into_iter()
            .map(|op| (op.tag, op.a_start, op.a_end, op.b_start, op.b_end))
            .collect()
    }

    #[test]
    fn classic_opcode_example() {
        assert_eq!(
            ops("qabxcd", "abycdf"),
            vec![
                (Tag::Delete, 0, 1, 0, 0),
                (Tag::Equal, 1, 3, 0, 2),
                (Tag::Replace, 3, 4, 2, 3),
                (Tag::Equal, 4, 6, 3, 5),
                (Tag::Insert, 6, 6, 5, 6),
            ]
        );
    }

    #[test]
    fn longest_match_prefers_earliest() {
        let (a, b) = (chars(" abcd"), chars("abcd abcd"));
        let m = SequenceMatcher::new(&a, &b).find_longest_match(0, 5, 0, 9);
        assert_eq!(m, Match { a: 0, b: 4, size: 5 });
    }

    #[test]
    fn matching_blocks_end_with_sentinel() {
        let (a, b) = (chars("abxcd"), chars("abcd"));
        let blocks = SequenceMatcher::new(&a, &b).matching_blocks();
        assert_eq!(
            blocks,
            vec![
                Match { a: 0, b: 0, size: 2 },
                Match { a: 3, b: 2, size: 2 },
                Match { a: 5, b: 4, size: 0 },
            ]
        );
    }

    #[test]
    fn empty_inputs() {
        assert!(ops("", "").is_empty());
        assert_eq!(ops("", "ab"), vec![(Tag::Insert, 0, 0, 0, 2)]);
        assert_eq!(ops("ab", ""), vec![(Tag::Delete, 0, 2, 0, 0)]);
        assert_eq!(highlight_diff("", "ab"), (String::new(), "[ab]".to_string()));
    }

    #[test]
    fn phone_change_keeps_common_prefix() {
        assert_eq!(
            highlight_diff("TELEPHONE 111", "TELEPHONE 222"),
            ("TELEPHONE [111]".to_string(), "TELEPHONE [222]".to_string())
        );
    }

    #[test]
    fn identical_strings_are_unmarked() {
        let text = "MR SMITH\nMM SMITH";
        assert_eq!(highlight_diff(text, text), (text.to_string(), text.to_string()));
    }

    #[test]
    fn insertion_in_multiline_value() {
        let (old, new) = highlight_diff("MR A\nMM B", "MR A\nCH C\nMM B");
        assert_eq!(old, "MR A\nMM B");
        assert_eq!(strip_brackets(&new), "MR A\nCH C\nMM B");
        assert!(new.contains('['));
    }

    #[test]
    fn popular_characters_do_not_seed_matches() {
        // 'x' appears far more than len/100 + 1 times in b, so only 'y' can seed.
        let a: Vec<char> = "xy".chars().collect();
        let b: Vec<char> = std::iter::repeat('x').take(250).chain(std::iter::once('y')).collect();
        let m = SequenceMatcher::new(&a, &b).find_longest_match(0, a.len(), 0, b.len());
        assert_eq!(m, Match { a: 0, b: 249, size: 2 });
    }

    fn strip_brackets(s: &str) -> String {
        s.chars().filter(|c| *c != '[' && *c != ']').collect()
    }

    #[test]
    fn stripping_marks_gives_back_the_inputs() {
        let pairs = [
            ("BA 123 LHR CMB", "BA 124 LHR MLE"),
            ("MR SMITH JOHN\nMM SMITH JANE", "MM SMITH JANE\nCH SMITH TOM"),
            ("TELEPHONE 0771234567", ""),
            ("Telephone: ÉTÉ 11", "Téléphone: été 12"),
        ];
        for (a, b) in pairs {
            let (marked_a, marked_b) = highlight_diff(a, b);
            assert_eq!(strip_brackets(&marked_a), a);
            assert_eq!(strip_brackets(&marked_b), b);
        }
    }
}

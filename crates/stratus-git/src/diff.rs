//! Line diffs.
//!
//! Myers' O(ND) algorithm over lines, grouped into unified-diff hunks.

/// Leading bytes inspected when deciding whether content is binary.
pub const BINARY_SNIFF_LEN: usize = 8000;

/// Default number of unchanged lines around each change.
pub const CONTEXT_LINES: usize = 3;

/// Largest edit distance searched before falling back to a full rewrite.
const MAX_EDIT_DISTANCE: usize = 2048;

/// Returns true if the leading bytes contain a NUL.
pub fn is_binary(data: &[u8]) -> bool {
    let end = data.len().min(BINARY_SNIFF_LEN);
    data[..end].contains(&0)
}

/// Kind of a diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Present on both sides.
    Context,
    /// Only in the new side.
    Addition,
    /// Only in the old side.
    Deletion,
}

/// One line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// Line kind.
    pub kind: LineKind,
    /// Line text without its terminator.
    pub content: String,
}

/// A contiguous group of changes with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// First old line (1-based; the preceding line when `old_lines` is 0).
    pub old_start: usize,
    /// Old lines covered.
    pub old_lines: usize,
    /// First new line (1-based; the preceding line when `new_lines` is 0).
    pub new_start: usize,
    /// New lines covered.
    pub new_lines: usize,
    /// Hunk body.
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// The `@@ -a,b +c,d @@` header.
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_lines, self.new_start, self.new_lines
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal(usize),
    Delete(usize),
    Insert(usize),
}

/// Splits text into lines, dropping terminators.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n')
        .map(|line| line.strip_suffix('\n').unwrap_or(line))
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Shortest edit script from `a` to `b`.
fn myers(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    if max == 0 {
        return Vec::new();
    }
    let offset = max as isize + 1;
    let mut v = vec![0isize; 2 * max + 3];
    // trace[d] holds v[-d-1..=d+1] as it stood when round d began.
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut found = None;

    'search: for d in 0..=max.min(MAX_EDIT_DISTANCE) as isize {
        let lo = (offset - d - 1) as usize;
        let hi = (offset + d + 1) as usize;
        trace.push(v[lo..=hi].to_vec());

        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                found = Some(d);
                break 'search;
            }
            k += 2;
        }
    }

    let Some(depth) = found else {
        return rewrite(a.len(), b.len());
    };

    let mut edits = Vec::new();
    let (mut x, mut y) = (n, m);
    for d in (0..=depth).rev() {
        let row = &trace[d as usize];
        let at = |k: isize| row[(k + d + 1) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::Equal((x - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert((y - 1) as usize));
            } else {
                edits.push(Edit::Delete((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    edits.reverse();
    edits
}

/// Delete everything, insert everything.
fn rewrite(old: usize, new: usize) -> Vec<Edit> {
    (0..old)
        .map(Edit::Delete)
        .chain((0..new).map(Edit::Insert))
        .collect()
}

/// Computes unified-diff hunks between two texts.
pub fn diff_lines(old: &str, new: &str, context: usize) -> Vec<Hunk> {
    let a = split_lines(old);
    let b = split_lines(new);
    let edits = myers(&a, &b);

    // Old/new line counts consumed before each edit.
    let mut positions = Vec::with_capacity(edits.len());
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    for edit in &edits {
        positions.push((old_pos, new_pos));
        match edit {
            Edit::Equal(..) => {
                old_pos += 1;
                new_pos += 1;
            }
            Edit::Delete(_) => old_pos += 1,
            Edit::Insert(_) => new_pos += 1,
        }
    }

    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, edit)| !matches!(edit, Edit::Equal(..)))
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return Vec::new();
    }

    // Group changes whose gap of equal lines fits within both contexts.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &i in &changes {
        match groups.last_mut() {
            Some((_, last)) if i - *last <= 2 * context + 1 => *last = i,
            _ => groups.push((i, i)),
        }
    }

    groups
        .into_iter()
        .map(|(first, last)| {
            let start = first.saturating_sub(context);
            let end = (last + context).min(edits.len() - 1);
            let (old_before, new_before) = positions[start];

            let mut hunk = Hunk {
                old_start: 0,
                old_lines: 0,
                new_start: 0,
                new_lines: 0,
                lines: Vec::with_capacity(end - start + 1),
            };
            for edit in &edits[start..=end] {
                let line = match *edit {
                    Edit::Equal(i) => {
                        hunk.old_lines += 1;
                        hunk.new_lines += 1;
                        DiffLine {
                            kind: LineKind::Context,
                            content: a[i].to_string(),
                        }
                    }
                    Edit::Delete(i) => {
                        hunk.old_lines += 1;
                        DiffLine {
                            kind: LineKind::Deletion,
                            content: a[i].to_string(),
                        }
                    }
                    Edit::Insert(j) => {
                        hunk.new_lines += 1;
                        DiffLine {
                            kind: LineKind::Addition,
                            content: b[j].to_string(),
                        }
                    }
                };
                hunk.lines.push(line);
            }
            hunk.old_start = if hunk.old_lines == 0 { old_before } else { old_before + 1 };
            hunk.new_start = if hunk.new_lines == 0 { new_before } else { new_before + 1 };
            hunk
        })
        .collect()
}

/// Added and deleted line counts across hunks.
pub fn line_stats(hunks: &[Hunk]) -> (usize, usize) {
    hunks
        .iter()
        .flat_map(|hunk| &hunk.lines)
        .fold((0, 0), |(add, del), line| match line.kind {
            LineKind::Addition => (add + 1, del),
            LineKind::Deletion => (add, del + 1),
            LineKind::Context => (add, del),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_detection() {
        let mut data = vec![b'a'; 1000];
        assert!(!is_binary(&data));
        data[500] = 0;
        assert!(is_binary(&data));

        let mut late = vec![b'a'; 10_000];
        late[9000] = 0;
        assert!(!is_binary(&late));
    }

    #[test]
    fn test_identical_texts_have_no_hunks() {
        assert!(diff_lines("a\nb\n", "a\nb\n", 3).is_empty());
        assert!(diff_lines("", "", 3).is_empty());
    }

    #[test]
    fn test_single_change_with_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\n2\n3\n4\nfive\n6\n7\n8\n9\n";
        let hunks = diff_lines(old, new, 3);

        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(hunk.header(), "@@ -2,7 +2,7 @@");
        assert_eq!(line_stats(&hunks), (1, 1));
        assert_eq!(hunk.lines[3].kind, LineKind::Deletion);
        assert_eq!(hunk.lines[3].content, "5");
        assert_eq!(hunk.lines[4].kind, LineKind::Addition);
        assert_eq!(hunk.lines[4].content, "five");
    }

    #[test]
    fn test_distant_changes_split_into_hunks() {
        let old: String = (1..=20).map(|i| format!("{}\n", i)).collect();
        let new: String = (1..=20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                18 => "eighteen\n".to_string(),
                _ => format!("{}\n", i),
            })
            .collect();
        let hunks = diff_lines(&old, &new, 3);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].old_start, 15);
    }

    #[test]
    fn test_new_file_hunk() {
        let hunks = diff_lines("", "a\nb\n", 3);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].header(), "@@ -0,0 +1,2 @@");
    }

    #[test]
    fn test_deleted_file_hunk() {
        let hunks = diff_lines("a\nb\n", "", 3);
        assert_eq!(hunks[0].header(), "@@ -1,2 +0,0 @@");
        assert_eq!(line_stats(&hunks), (0, 2));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn apply(old: &[&str], hunks: &[Hunk]) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = 0;
        for hunk in hunks {
            let start = if hunk.old_lines == 0 { hunk.old_start } else { hunk.old_start - 1 };
            out.extend(old[cursor..start].iter().map(|s| s.to_string()));
            cursor = start;
            for line in &hunk.lines {
                match line.kind {
                    LineKind::Context => {
                        out.push(line.content.clone());
                        cursor += 1;
                    }
                    LineKind::Deletion => cursor += 1,
                    LineKind::Addition => out.push(line.content.clone()),
                }
            }
        }
        out.extend(old[cursor..].iter().map(|s| s.to_string()));
        out
    }

    proptest! {
        /// Property: applying the hunks to the old text yields the new text.
        #[test]
        fn prop_hunks_reconstruct_new_text(
            old in prop::collection::vec("[abc]", 0..30),
            new in prop::collection::vec("[abc]", 0..30),
        ) {
            let old_text: String = old.iter().map(|l| format!("{}\n", l)).collect();
            let new_text: String = new.iter().map(|l| format!("{}\n", l)).collect();
            let hunks = diff_lines(&old_text, &new_text, CONTEXT_LINES);

            let old_lines = split_lines(&old_text);
            prop_assert_eq!(apply(&old_lines, &hunks), new);
        }

        /// Property: hunk headers agree with their bodies.
        #[test]
        fn prop_hunk_counts_match_lines(
            old in prop::collection::vec("[ab]", 0..20),
            new in prop::collection::vec("[ab]", 0..20),
        ) {
            let old_text: String = old.iter().map(|l| format!("{}\n", l)).collect();
            let new_text: String = new.iter().map(|l| format!("{}\n", l)).collect();
            for hunk in diff_lines(&old_text, &new_text, 1) {
                let old_count = hunk.lines.iter().filter(|l| l.kind != LineKind::Addition).count();
                let new_count = hunk.lines.iter().filter(|l| l.kind != LineKind::Deletion).count();
                prop_assert_eq!(hunk.old_lines, old_count);
                prop_assert_eq!(hunk.new_lines, new_count);
            }
        }
    }
}

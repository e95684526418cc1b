use std::path::Path;

const LINK_DELIMITER: char = ';';

/// Ordered list of raw links taken from the command line or a links file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkBatch(Vec<String>);

impl LinkBatch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push_raw(&mut self, raw: &str) {
        if raw.contains(LINK_DELIMITER) {
            self.0.extend(raw.split(LINK_DELIMITER).map(str::to_string));
        } else {
            self.0.push(raw.to_string());
        }
    }
}

impl<'a> IntoIterator for &'a LinkBatch {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<LinkBatch> for Vec<String> {
    fn from(batch: LinkBatch) -> Self {
        batch.0
    }
}

/// Expands CLI arguments into a flat batch of links.
///
/// When the first argument names an existing file, the remaining arguments
/// are ignored and every non-blank line of that file is used instead.
/// Arguments (and lines) containing `;` are split in place.
pub fn normalize<S: AsRef<str>>(raw_args: &[S]) -> std::io::Result<LinkBatch> {
    let mut batch = LinkBatch::default();

    if let Some(first) = raw_args.first() {
        let path = Path::new(first.as_ref());
        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                batch.push_raw(line);
            }
            return Ok(batch);
        }
    }

    for arg in raw_args {
        batch.push_raw(arg.as_ref());
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn links(batch: LinkBatch) -> Vec<String> {
        batch.into()
    }

    #[test]
    fn test_plain_arguments_keep_order() {
        let batch = normalize(&["https://deezer.com/track/1", "https://deezer.com/album/2"]).unwrap();
        assert_eq!(
            links(batch),
            vec!["https://deezer.com/track/1", "https://deezer.com/album/2"]
        );
    }

    #[test]
    fn test_delimited_argument_expands_in_place() {
        let args = ["first", "trackA;trackB;trackC", "last"];
        let batch = normalize(&args).unwrap();
        let expected_len: usize = args.iter().map(|a| a.split(';').count()).sum();
        assert_eq!(batch.len(), expected_len);
        assert_eq!(
            links(batch),
            vec!["first", "trackA", "trackB", "trackC", "last"]
        );
    }

    #[test]
    fn test_file_replaces_other_arguments() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("links.txt");
        std::fs::write(&file, "https://deezer.com/track/1\nhttps://deezer.com/track/2\n").unwrap();
        let first = file.to_string_lossy().to_string();

        let batch = normalize(&[first.as_str(), "https://deezer.com/track/99"]).unwrap();
        assert_eq!(
            links(batch),
            vec!["https://deezer.com/track/1", "https://deezer.com/track/2"]
        );
    }

    #[test]
    fn test_file_lines_are_split_and_crlf_stripped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("links.txt");
        std::fs::write(&file, "a;b\r\n\r\nc\r\n").unwrap();

        let batch = normalize(&[file.to_string_lossy().to_string()]).unwrap();
        assert_eq!(links(batch), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_file_is_empty_batch() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("empty.txt");
        std::fs::write(&file, "").unwrap();

        let batch = normalize(&[file.to_string_lossy().to_string()]).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_no_arguments() {
        let batch = normalize::<&str>(&[]).unwrap();
        assert!(batch.is_empty());
    }
}

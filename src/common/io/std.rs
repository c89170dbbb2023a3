//! Common I/O code using sync I/O.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use flate2::bufread::MultiGzDecoder;

/// Returns whether the path looks like a gzip or bgzip file.
pub fn is_gz<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    [Some(Some("gz")), Some(Some("bgz"))].contains(&path.as_ref().extension().map(|s| s.to_str()))
}

/// Transparently open a file with gzip decoder for reading.
///
/// Note that decoding of multi-member gzip files is automatically supported, as is needed for
/// `bgzip` files.
///
/// # Arguments
///
/// * `path` - A path to the file to open.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("could not open file {}: {}", path.as_ref().display(), e))?;
    if is_gz(path.as_ref()) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read all non-empty lines of a plain or gzip-compressed text file.
///
/// Trailing whitespace (including `\r`) is removed from each line.
pub fn read_lines_maybe_gz<P>(path: P) -> Result<Vec<String>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let reader = open_read_maybe_gz(path.as_ref())?;
    let mut result = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| {
            anyhow::anyhow!("problem reading from {}: {}", path.as_ref().display(), e)
        })?;
        let line = line.trim_end();
        if !line.is_empty() {
            result.push(line.to_string());
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("lines.txt")]
    #[case("lines.txt.gz")]
    fn open_read_maybe_gz(#[case] path: &str) -> Result<(), anyhow::Error> {
        let mut reader = super::open_read_maybe_gz(format!("tests/data/common/io/{}", path))?;
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;

        assert_eq!(buf, "first\n\nsecond  \nthird\n");

        Ok(())
    }

    #[rstest::rstest]
    #[case("lines.txt", false)]
    #[case("lines.txt.gz", true)]
    #[case("lines.txt.bgz", true)]
    #[case("lines.vcf", false)]
    fn is_gz(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(super::is_gz(path), expected);
    }

    #[rstest::rstest]
    #[case("lines.txt")]
    #[case("lines.txt.gz")]
    fn read_lines_maybe_gz(#[case] path: &str) -> Result<(), anyhow::Error> {
        let lines = super::read_lines_maybe_gz(format!("tests/data/common/io/{}", path))?;

        assert_eq!(lines, vec!["first", "second", "third"]);

        Ok(())
    }

    #[test]
    fn open_read_missing_file() {
        let result = super::open_read_maybe_gz("tests/data/common/io/does-not-exist.txt");
        assert!(result.is_err());
    }
}

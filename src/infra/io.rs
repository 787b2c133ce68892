use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

/// Raw bytes of an input binary, mapped or buffered.
pub enum BinaryContent {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl AsRef<[u8]> for BinaryContent {
    fn as_ref(&self) -> &[u8] {
        match self {
            BinaryContent::Mapped(mmap) => &mmap[..],
            BinaryContent::Buffered(bytes) => bytes.as_slice(),
        }
    }
}

impl BinaryContent {
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a binary read-only: mmap above 1 MiB, plain read below.
pub fn read_binary<P: AsRef<Path>>(path: P) -> Result<BinaryContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: read-only mapping; the file is not modified while mapped
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(BinaryContent::Mapped(mmap))
    } else {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(BinaryContent::Buffered(bytes))
    }
}

/// Write candidate texts one per line as UTF-8, for human review.
pub fn write_lines<'a, P, I>(path: P, lines: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a str>,
{
    let path = path.as_ref();
    let mut out = std::io::BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );

    let mut count = 0;
    for line in lines {
        // Embedded newlines would split a candidate across lines
        writeln!(out, "{}", line.replace('\n', "\\n"))?;
        count += 1;
    }
    out.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_files_are_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.bin");
        std::fs::write(&path, [0x82, 0xA0, 0x82, 0xA2]).unwrap();

        let content = read_binary(&path).unwrap();
        assert!(matches!(content, BinaryContent::Buffered(_)));
        assert_eq!(content.as_ref(), &[0x82, 0xA0, 0x82, 0xA2]);
    }

    #[test]
    fn large_files_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; (MMAP_THRESHOLD + 1) as usize]).unwrap();

        let content = read_binary(&path).unwrap();
        assert!(matches!(content, BinaryContent::Mapped(_)));
        assert_eq!(content.len(), (MMAP_THRESHOLD + 1) as usize);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_binary("/definitely/not/here.bin").err().unwrap();
        assert!(format!("{err:#}").contains("Failed to read metadata"));
    }

    #[test]
    fn write_lines_escapes_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let n = write_lines(&path, ["あい", "う\nえ"]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "あい\nう\\nえ\n");
    }
}

use crate::attributes::FileAttributes;
use crate::context::DataOpsContext;

/// Transformation applied to content on its way to and from the mainframe.
pub trait ContentAdapter: Send + Sync {
    /// Whether resources with `attributes` are handled.
    fn accepts(&self, attributes: &FileAttributes) -> bool;

    /// Remote content as the editor should see it.
    fn adapt_content_from_mainframe(
        &self,
        content: &[u8],
        attributes: &FileAttributes,
        context: &DataOpsContext,
    ) -> Vec<u8>;

    /// Editor content as the mainframe should receive it.
    fn prepare_content_to_mainframe(
        &self,
        content: &[u8],
        attributes: &FileAttributes,
        context: &DataOpsContext,
    ) -> Vec<u8>;
}

/// Whitespace handling for datasets and members.
///
/// Fixed-length records come back padded with blanks up to the record
/// length; the padding is stripped for the editor. Outgoing content has its
/// line endings normalized.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContentAdapter;

impl DefaultContentAdapter {
    fn has_fixed_records(attributes: &FileAttributes, context: &DataOpsContext) -> bool {
        match attributes {
            FileAttributes::Dataset(dataset) => dataset.info.is_fixed_record(),
            FileAttributes::Member(_) => context
                .parent_attributes(attributes)
                .ok()
                .and_then(|parent| parent.as_dataset().map(|d| d.info.is_fixed_record()))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Strip the blanks at the end of every line.
fn trim_record_padding(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    for (i, line) in content.split(|b| *b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        let end = line.iter().rposition(|b| *b != b' ').map_or(0, |p| p + 1);
        out.extend_from_slice(&line[..end]);
    }
    out
}

/// Turn CRLF line endings into LF.
fn normalize_line_endings(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut bytes = content.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

impl ContentAdapter for DefaultContentAdapter {
    fn accepts(&self, attributes: &FileAttributes) -> bool {
        matches!(
            attributes,
            FileAttributes::Dataset(_) | FileAttributes::Member(_)
        )
    }

    fn adapt_content_from_mainframe(
        &self,
        content: &[u8],
        attributes: &FileAttributes,
        context: &DataOpsContext,
    ) -> Vec<u8> {
        if Self::has_fixed_records(attributes, context) {
            trim_record_padding(content)
        } else {
            content.to_vec()
        }
    }

    fn prepare_content_to_mainframe(
        &self,
        content: &[u8],
        _attributes: &FileAttributes,
        _context: &DataOpsContext,
    ) -> Vec<u8> {
        normalize_line_endings(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_record_padding() {
        let padded = b"//JOB1   JOB   \n  EXEC PGM=IEFBR14     \n\n   ";
        assert_eq!(
            trim_record_padding(padded),
            b"//JOB1   JOB\n  EXEC PGM=IEFBR14\n\n".to_vec()
        );
    }

    #[test]
    fn test_trim_keeps_leading_blanks() {
        assert_eq!(trim_record_padding(b"   x  "), b"   x".to_vec());
        assert_eq!(trim_record_padding(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings(b"a\r\nb\rc\r\n"), b"a\nb\rc\n".to_vec());
    }
}

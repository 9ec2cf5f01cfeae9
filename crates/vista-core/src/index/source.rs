//! Reading the persisted index table.
//!
//! The table is comma-separated with a header row naming its columns. Only
//! the image identifier and tags columns are read; any others are ignored.
//! Fields may be double-quoted, with `""` standing for a literal quote.

use std::path::Path;

use crate::config::IndexConfig;
use crate::error::PipelineError;

use super::tag_index::{IndexRow, TagIndex};

/// Column layout of an index table.
#[derive(Debug, Clone)]
pub struct IndexSource {
    id_column: String,
    tags_column: String,
}

impl Default for IndexSource {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

impl IndexSource {
    /// Use the column names from the index config.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self {
            id_column: config.id_column.clone(),
            tags_column: config.tags_column.clone(),
        }
    }

    /// Read and build the index from a file.
    pub fn load(&self, path: &Path) -> Result<TagIndex, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Failed to read index table: {e}"),
        })?;

        let index = TagIndex::build(self.parse(&content)?)?;
        tracing::info!("Loaded index: {} images from {:?}", index.len(), path);
        Ok(index)
    }

    /// Parse table text into raw rows.
    ///
    /// Blank lines are skipped. The header must name both configured columns.
    /// A row's line number is the line its record starts on.
    pub fn parse(&self, content: &str) -> Result<Vec<IndexRow>, PipelineError> {
        let mut records = read_records(content)?.into_iter();

        let Some(header) = records.next() else {
            return Ok(Vec::new());
        };
        // A UTF-8 BOM would otherwise stick to the first column name.
        let column = |name: &str| {
            header
                .fields
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| PipelineError::MalformedIndexRow {
                    line: header.line,
                    message: format!("header has no '{name}' column"),
                })
        };
        let id_idx = column(&self.id_column)?;
        let tags_idx = column(&self.tags_column)?;

        let mut rows = Vec::new();
        for Record { line, mut fields } in records {
            if fields.len() <= id_idx {
                return Err(PipelineError::MalformedIndexRow {
                    line,
                    message: format!("missing '{}' field", self.id_column),
                });
            }
            // A missing trailing tags field reads as "no tags".
            let tags = if tags_idx < fields.len() {
                std::mem::take(&mut fields[tags_idx])
            } else {
                String::new()
            };
            rows.push(IndexRow {
                line,
                image_id: std::mem::take(&mut fields[id_idx]),
                tags,
            });
        }

        Ok(rows)
    }
}

/// One comma-separated record and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Split comma-separated text into records, honouring double quotes.
///
/// Quoted fields may span line breaks. Records that are blank outside of
/// quotes are skipped, and `\r\n` is read as `\n`.
pub(crate) fn read_records(content: &str) -> Result<Vec<Record>, PipelineError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut start_line = 1;
    let mut chars = content.chars().peekable();

    let mut finish = |fields: &mut Vec<String>, field: &mut String, quoted: bool, start: usize| {
        fields.push(std::mem::take(field));
        let blank = !quoted && fields.len() == 1 && fields[0].trim().is_empty();
        let fields = std::mem::take(fields);
        if !blank {
            records.push(Record {
                line: start,
                fields,
            });
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quoted = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                if in_quotes {
                    field.push('\n');
                } else {
                    finish(&mut fields, &mut field, quoted, start_line);
                    quoted = false;
                    start_line = line;
                }
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(PipelineError::MalformedIndexRow {
            line: start_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !fields.is_empty() || !field.is_empty() || quoted {
        finish(&mut fields, &mut field, quoted, start_line);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_table() {
        let rows = IndexSource::default()
            .parse("image_name,tags\nimg1.png,sky;sea\nimg2.png,forest\n")
            .unwrap();
        assert_eq!(
            rows,
            vec![
                IndexRow::new(2, "img1.png", "sky;sea"),
                IndexRow::new(3, "img2.png", "forest"),
            ]
        );
    }

    #[test]
    fn test_parse_column_order_from_header() {
        let rows = IndexSource::default()
            .parse("tags,source,image_name\nsky; sea,web,img1.png\n")
            .unwrap();
        assert_eq!(rows[0].image_id, "img1.png");
        assert_eq!(rows[0].tags, "sky; sea");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let rows = IndexSource::default()
            .parse("image_name,tags\n\"a, b.png\",\"sky; \"\"sea\"\"\"\n")
            .unwrap();
        assert_eq!(rows[0].image_id, "a, b.png");
        assert_eq!(rows[0].tags, "sky; \"sea\"");
    }

    #[test]
    fn test_parse_skips_blank_lines_and_crlf() {
        let rows = IndexSource::default()
            .parse("image_name,tags\r\n\r\nimg1.png,sky\r\n")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 3);
        assert_eq!(rows[0].tags, "sky");
    }

    #[test]
    fn test_parse_bom_header() {
        let rows = IndexSource::default()
            .parse("\u{feff}image_name,tags\nimg1.png,sky\n")
            .unwrap();
        assert_eq!(rows[0].image_id, "img1.png");
    }

    #[test]
    fn test_missing_header_column() {
        let err = IndexSource::default()
            .parse("file,tags\nimg1.png,sky\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedIndexRow { line: 1, .. }));
        assert!(err.to_string().contains("image_name"));
    }

    #[test]
    fn test_row_missing_identifier_field() {
        let err = IndexSource::default()
            .parse("tags,image_name\nsky\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedIndexRow { line: 2, .. }));
    }

    #[test]
    fn test_missing_tags_field_reads_as_empty() {
        let rows = IndexSource::default()
            .parse("image_name,tags\nimg1.png\n")
            .unwrap();
        assert_eq!(rows[0].tags, "");
    }

    #[test]
    fn test_quoted_tags_span_lines() {
        let rows = IndexSource::default()
            .parse("image_name,tags\nimg1.png,\"sky;\nsea\"\nimg2.png,forest\n")
            .unwrap();
        assert_eq!(
            rows,
            vec![
                IndexRow::new(2, "img1.png", "sky;\nsea"),
                IndexRow::new(4, "img2.png", "forest"),
            ]
        );

        let index = TagIndex::build(rows).unwrap();
        let mut tags: Vec<&str> = index
            .tags_of("img1.png")
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        tags.sort_unstable();
        assert_eq!(tags, vec!["sea", "sky"]);
    }

    #[test]
    fn test_read_records_lines_and_blanks() {
        let records = read_records("a,b\r\n\r\n\"x\r\ny\",z\nlast").unwrap();
        assert_eq!(
            records,
            vec![
                Record {
                    line: 1,
                    fields: vec!["a".into(), "b".into()]
                },
                Record {
                    line: 3,
                    fields: vec!["x\ny".into(), "z".into()]
                },
                Record {
                    line: 5,
                    fields: vec!["last".into()]
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let err = IndexSource::default()
            .parse("image_name,tags\n\"img1.png,sky\n")
            .unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_empty_content_is_empty_index() {
        assert!(IndexSource::default().parse("").unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image-tag.csv");
        std::fs::write(&path, "image_name,tags\nimg1.png,sky;sea\n,forest\n").unwrap();

        let err = IndexSource::default().load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedIndexRow { line: 3, .. }));

        std::fs::write(&path, "image_name,tags\nimg1.png,sky;sea\nimg2.png,\n").unwrap();
        let index = IndexSource::default().load(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.tags_of("img2.png").unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = IndexSource::default()
            .load(Path::new("/nonexistent/index.csv"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_custom_columns() {
        let config = IndexConfig {
            id_column: "file".to_string(),
            tags_column: "labels".to_string(),
            ..IndexConfig::default()
        };
        let rows = IndexSource::from_config(&config)
            .parse("file,labels\nx.jpg,night\n")
            .unwrap();
        assert_eq!(rows[0].image_id, "x.jpg");
    }
}

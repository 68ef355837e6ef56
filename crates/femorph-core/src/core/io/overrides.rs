use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// User-supplied atom-name pairs forcing correspondences during mapping.
///
/// Each pair maps an atom name in the initial structure to an atom name in
/// the final structure. Order is preserved so diagnostics refer to the pair
/// as the user wrote it. Resolution against the structures (and the failure
/// on a name that does not exist) happens in the mapper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsotopeOverrideMap {
    pairs: Vec<(String, String)>,
}

impl IsotopeOverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, initial_name: &str, final_name: &str) {
        self.pairs
            .push((initial_name.to_string(), final_name.to_string()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[derive(Debug, Error)]
pub enum OverrideMapError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: String,
        source: io::Error,
    },
    #[error("Malformed override on line {line}: expected two atom names, found {found}")]
    Malformed { line: usize, found: usize },
}

/// Reads an override map file.
///
/// The format is one pair per line, whitespace separated: the atom name in
/// the initial structure followed by the atom name in the final structure.
/// `#` starts a comment; blank lines are skipped. A missing file is not an
/// error and yields an empty map.
///
/// # Arguments
///
/// * `path` - The path to the override file.
///
/// # Errors
///
/// Returns an error for unreadable files or lines that do not hold exactly
/// two names.
pub fn read_override_map(path: &Path) -> Result<IsotopeOverrideMap, OverrideMapError> {
    if !path.exists() {
        return Ok(IsotopeOverrideMap::new());
    }

    let content = fs::read_to_string(path).map_err(|e| OverrideMapError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let mut map = IsotopeOverrideMap::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 2 {
            return Err(OverrideMapError::Malformed {
                line: line_num + 1,
                found: fields.len(),
            });
        }
        map.insert(fields[0], fields[1]);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_empty_map() {
        let map = read_override_map(Path::new("/nonexistent/overrides.map")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn reads_pairs_in_order() {
        let file = write_file("C1 C4\nN2 N7\n");
        let map = read_override_map(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.pairs(),
            &[
                ("C1".to_string(), "C4".to_string()),
                ("N2".to_string(), "N7".to_string()),
            ]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let file = write_file("# forced pairs\n\nC1 C4  # ring carbon\n   \n");
        let map = read_override_map(file.path()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.pairs()[0], ("C1".to_string(), "C4".to_string()));
    }

    #[test]
    fn rejects_lines_with_wrong_field_count() {
        let file = write_file("C1 C4 C5\n");
        let result = read_override_map(file.path());
        assert!(matches!(
            result,
            Err(OverrideMapError::Malformed { line: 1, found: 3 })
        ));
    }
}

use crate::error::EnvironmentError;
use std::path::Path;

/// Free-text label describing the machine the target runs on, read from a
/// one-line `KEY=VALUE` file such as `MACHINE_TYPE="c5.large"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    pub key: String,
    pub label: String,
}

impl EnvironmentDescriptor {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| EnvironmentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Uses the first line that is neither blank nor a `#` comment. Quotes are
    /// stripped from the value.
    pub fn parse(contents: &str) -> Result<Self, EnvironmentError> {
        let line = contents
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or(EnvironmentError::Empty)?;

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| EnvironmentError::Malformed(line.to_string()))?;
        let key = key.trim();
        let label = value.trim().replace('"', "");
        let label = label.trim();

        if key.is_empty() || label.is_empty() {
            return Err(EnvironmentError::Malformed(line.to_string()));
        }

        Ok(Self {
            key: key.to_string(),
            label: label.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_quotes() {
        let env = EnvironmentDescriptor::parse("MACHINE_TYPE=\"c5.large\"\n").unwrap();
        assert_eq!(env.key, "MACHINE_TYPE");
        assert_eq!(env.label, "c5.large");
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let env = EnvironmentDescriptor::parse("\n# edge box\n  infra = rpi 4 (8GB)  \nOTHER=x\n")
            .unwrap();
        assert_eq!(env.key, "infra");
        assert_eq!(env.label, "rpi 4 (8GB)");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            EnvironmentDescriptor::parse(""),
            Err(EnvironmentError::Empty)
        ));
        assert!(matches!(
            EnvironmentDescriptor::parse("# only a comment\n"),
            Err(EnvironmentError::Empty)
        ));
        assert!(matches!(
            EnvironmentDescriptor::parse("c5.large"),
            Err(EnvironmentError::Malformed(_))
        ));
        assert!(matches!(
            EnvironmentDescriptor::parse("MACHINE_TYPE=\"\""),
            Err(EnvironmentError::Malformed(_))
        ));
        assert!(matches!(
            EnvironmentDescriptor::parse("=c5.large"),
            Err(EnvironmentError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infra.txt");
        std::fs::write(&path, "MACHINE_TYPE=\"m6g.xlarge\"\n").unwrap();
        assert_eq!(
            EnvironmentDescriptor::from_file(&path).unwrap().label,
            "m6g.xlarge"
        );

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            EnvironmentDescriptor::from_file(&missing),
            Err(EnvironmentError::Read { .. })
        ));
    }
}

use std::path::{Path, PathBuf};

/// Flat, name-addressed file storage.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.base_dir.join(ident);
        let temp_path = self
            .base_dir
            .join(format!("{}-{ident}", rusty_ulid::generate_ulid_string()));

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_exists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BackendLocal::new(dir.path().join("nested")).unwrap();

        assert!(!storage.exists("config.yaml"));
        storage.write("config.yaml", b"a: 1").unwrap();
        assert!(storage.exists("config.yaml"));
        assert_eq!(storage.read("config.yaml").unwrap(), b"a: 1");

        storage.write("config.yaml", b"a: 2").unwrap();
        assert_eq!(storage.read("config.yaml").unwrap(), b"a: 2");

        // temp files don't linger
        let files = std::fs::read_dir(&storage.base_dir).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BackendLocal::new(dir.path()).unwrap();
        assert!(storage.read("nope").is_err());
    }
}

//! 会话存储 - 页面跳转/重载后仍保留的键值槽位
//!
//! - `MemorySessionStore`: 进程内存储
//! - `FileSessionStore`: 每个 key 一个文件，读写删共用 `.lock` 文件锁，临时文件 + rename 原子替换

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::lock::lock;

/// 会话级键值存储
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.slots).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.slots).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.slots).remove(key);
        Ok(())
    }
}

/// 文件存储
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 默认目录: ~/.config/notify-center/session
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("notify-center")
            .join("session")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// key 中的非文件名字符替换为 '_'
    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl FileSessionStore {
    /// 打开 key 对应的 `.lock` 文件并加锁；读写删共用同一把锁
    fn lock_key(&self, path: &Path, exclusive: bool) -> Result<File> {
        use fs2::FileExt;

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open {}", lock_path.display()))?;
        if exclusive {
            lock_file.lock_exclusive()?;
        } else {
            lock_file.lock_shared()?;
        }
        Ok(lock_file)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        use fs2::FileExt;

        if !self.dir.exists() {
            return Ok(None);
        }

        let path = self.path_for(key);
        let lock_file = self.lock_key(&path, false)?;
        let result = match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        lock_file.unlock()?;
        result
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        use fs2::FileExt;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(key);
        let lock_file = self.lock_key(&path, true)?;

        // 写入临时文件后原子替换
        let temp_path = path.with_extension("tmp");
        let result = (|| -> Result<()> {
            let mut temp_file = File::create(&temp_path)?;
            temp_file.write_all(value.as_bytes())?;
            temp_file.sync_all()?;
            fs::rename(&temp_path, &path)?;
            Ok(())
        })();

        lock_file.unlock()?;
        result.with_context(|| format!("Failed to write {}", path.display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        use fs2::FileExt;

        if !self.dir.exists() {
            return Ok(());
        }

        let path = self.path_for(key);
        let lock_file = self.lock_key(&path, true)?;
        let result = match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        };
        lock_file.unlock()?;
        result
    }
}

use crate::core::error::{Error, ErrorKind, Result};

/// When mutations reach the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Immediate,  // sync after every mutation
    Manual,     // sync on explicit sync()/close()
}

/// How `Database::open` treats the location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,  // initialize when missing, open when present
    Open,    // fail with NotFound when missing
}

#[derive(Debug, Clone)]
pub struct Config {
    pub page_size: usize,
    pub cache_pages: usize,
    pub sync_mode: SyncMode,

    pub auto_compaction: bool,
    pub compaction_interval_secs: u64,
    pub compaction_garbage_ratio: f64,  // garbage / heap bytes that triggers auto compaction
}

impl Default for Config {
    fn default() -> Self {
        Config {
            page_size: 4096,                  // 4KB pages
            cache_pages: 1024,                // 4MB cache at the default page size
            sync_mode: SyncMode::Manual,

            auto_compaction: false,
            compaction_interval_secs: 300,    // at most every 5 minutes
            compaction_garbage_ratio: 0.5,
        }
    }
}

impl Config {
    pub const MIN_PAGE_SIZE: usize = 512;

    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two() || self.page_size < Self::MIN_PAGE_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("page size {} must be a power of two >= {}", self.page_size, Self::MIN_PAGE_SIZE),
            ));
        }
        if self.page_size > u32::MAX as usize {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("page size {} exceeds the addressable page size", self.page_size),
            ));
        }
        if self.cache_pages == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "cache must hold at least one page".to_string()));
        }
        if !(0.0..=1.0).contains(&self.compaction_garbage_ratio) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("compaction garbage ratio {} must be within [0, 1]", self.compaction_garbage_ratio),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_odd_page_sizes() {
        let config = Config { page_size: 3000, ..Config::default() };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::InvalidArgument);

        let config = Config { page_size: 256, ..Config::default() };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejects_empty_cache() {
        let config = Config { cache_pages: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a page: backing file index plus page index within that file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId {
    pub file_idx: u32,
    pub page_idx: u32,
}

impl PageId {
    pub fn new(file_idx: u32, page_idx: u32) -> Self {
        Self { file_idx, page_idx }
    }

    /// Byte offset of this page inside its backing file
    pub fn offset(&self) -> u64 {
        self.page_idx as u64 * super::PAGE_SIZE as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_idx, self.page_idx)
    }
}

impl FromStr for PageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, page) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("Invalid page id '{}', expected file:page", s))?;
        let file_idx = file
            .parse()
            .map_err(|_| format!("Invalid file index '{}'", file))?;
        let page_idx = page
            .parse()
            .map_err(|_| format!("Invalid page index '{}'", page))?;
        Ok(Self::new(file_idx, page_idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = PageId::new(2, 17);
        assert_eq!(id.to_string(), "2:17");
        assert_eq!("2:17".parse::<PageId>().unwrap(), id);
        assert!("2-17".parse::<PageId>().is_err());
        assert!("x:1".parse::<PageId>().is_err());
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageId::new(0, 0).offset(), 0);
        assert_eq!(PageId::new(3, 2).offset(), 2 * super::super::PAGE_SIZE as u64);
    }
}

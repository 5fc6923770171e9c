// Random-access byte sources for asset inspection
// Local files are read directly; remote assets use HTTP range requests

use crate::ProbeConfig;
use cinescope_core::{EngineError, EngineResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use url::Url;

/// Random-access reader over an asset
pub trait ByteSource: Send {
    /// Total length, if known
    fn len(&self) -> Option<u64>;

    /// Read up to `len` bytes at `offset`; short reads happen at end of asset
    fn read_at(&mut self, offset: u64, len: usize) -> EngineResult<Vec<u8>>;
}

/// Open a byte source for a validated asset URL
pub fn open_source(url: &Url, config: &ProbeConfig) -> EngineResult<Box<dyn ByteSource>> {
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| EngineError::new(format!("Not a local file path: {}", url)))?;
            Ok(Box::new(FileSource::open(&path)?))
        }
        "http" | "https" => Ok(Box::new(HttpSource::open(url.as_str(), config)?)),
        other => Err(EngineError::new(format!("Unsupported URL scheme: {}", other))),
    }
}

/// Local file
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open(path: &std::path::Path) -> EngineResult<Self> {
        let file = File::open(path)
            .map_err(|e| EngineError::new(format!("open {}: {}", path.display(), e)))?;
        let len = file
            .metadata()
            .map_err(|e| EngineError::new(format!("stat {}: {}", path.display(), e)))?
            .len();
        Ok(Self { file, len })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> Option<u64> {
        Some(self.len)
    }

    fn read_at(&mut self, offset: u64, len: usize) -> EngineResult<Vec<u8>> {
        if offset >= self.len {
            return Ok(Vec::new());
        }
        let to_read = (len as u64).min(self.len - offset) as usize;

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| EngineError::new(format!("seek failed: {}", e)))?;
        let mut buf = vec![0u8; to_read];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| EngineError::new(format!("read failed: {}", e)))?;
        Ok(buf)
    }
}

/// Create a configured HTTP agent with proper timeouts and settings
pub fn create_http_agent(config: &ProbeConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(config.connect_timeout)
        .timeout_read(config.read_timeout)
        .user_agent(&config.user_agent)
        .redirects(config.max_redirects)
        .build()
}

/// Remote asset read through `Range` requests
pub struct HttpSource {
    agent: ureq::Agent,
    url: String,
    len: Option<u64>,
}

impl HttpSource {
    pub fn open(url: &str, config: &ProbeConfig) -> EngineResult<Self> {
        let agent = create_http_agent(config);

        let response = agent
            .head(url)
            .call()
            .map_err(|e| EngineError::new(format!("HTTP HEAD failed: {}", e)))?;
        let len = response
            .header("Content-Length")
            .and_then(|s| s.parse::<u64>().ok());

        log::info!("[probe] remote asset {} length {:?}", url, len);

        Ok(Self {
            agent,
            url: url.to_string(),
            len,
        })
    }
}

impl ByteSource for HttpSource {
    fn len(&self) -> Option<u64> {
        self.len
    }

    fn read_at(&mut self, offset: u64, len: usize) -> EngineResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let end = offset + len as u64 - 1;
        let range = format!("bytes={}-{}", offset, end);

        let response = self
            .agent
            .get(&self.url)
            .set("Range", &range)
            .call()
            .map_err(|e| EngineError::new(format!("HTTP Range GET failed: {}", e)))?;

        // A server that ignores Range answers 200 with the whole body
        let skip = if response.status() == 206 { 0 } else { offset };

        let mut reader = response.into_reader().take(skip + len as u64);
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| EngineError::new(format!("Failed to read response: {}", e)))?;

        if skip > 0 {
            let start = (skip as usize).min(data.len());
            data.drain(..start);
        }
        Ok(data)
    }
}

/// In-memory asset
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn read_at(&mut self, offset: u64, len: usize) -> EngineResult<Vec<u8>> {
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data[start..end].to_vec())
    }
}

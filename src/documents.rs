//! 研究资料上传：只接受 PDF，原样保存
//!
//! 文档存入会话后不会被任何后端读取（尚无摄取流程），这里只负责校验与读入。

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("not a PDF: {0}")]
    NotPdf(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 不透明的文档内容
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    name: String,
    bytes: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

impl Document {
    /// 校验扩展名与文件头后构造
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DocumentError> {
        let name = name.into();
        let has_pdf_ext = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !has_pdf_ext || !bytes.starts_with(PDF_MAGIC) {
            return Err(DocumentError::NotPdf(name));
        }
        Ok(Self {
            name,
            bytes,
            uploaded_at: Utc::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }
}

/// 从磁盘读入一个 PDF；文档名取文件名部分
pub async fn load_pdf(path: &Path) -> Result<Document, DocumentError> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path).await.map_err(|source| DocumentError::Io {
        path: display.clone(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(display);
    let doc = Document::pdf(name, bytes)?;
    tracing::info!(name = %doc.name(), bytes = doc.size(), "Document uploaded");
    Ok(doc)
}

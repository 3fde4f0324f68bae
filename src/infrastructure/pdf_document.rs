//! PDF 文档句柄 - 基础设施层
//!
//! 唯一持有已打开 PDF 的模块，只向上暴露三种能力：
//! 页数、单页文本、单页内嵌图片。
//!
//! 句柄由单次提取调用独占：调用内打开、调用结束即释放（Drop），
//! 任何退出路径（包括提取出错）都不会泄漏句柄。

use crate::error::{AppError, AppResult};
use lopdf::{Dictionary, Document, Object};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 从页面资源中枚举出的内嵌图片
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// 派生名：XObject 名 + 按编码格式推断的扩展名（如 `Im1.jpg`）
    pub name: String,
    /// 原始字节（DCTDecode 流本身就是 JPEG 数据，不做解码）
    pub data: Vec<u8>,
}

/// 已打开的 PDF 文档
pub struct PdfDocument {
    doc: Document,
    path: PathBuf,
}

impl PdfDocument {
    /// 打开 PDF 文档
    ///
    /// 文件缺失或损坏直接返回 `DocumentError`，不重试。
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::document_not_found(path.to_string_lossy()));
        }

        let doc = Document::load(path)
            .map_err(|e| AppError::document_open_failed(path.to_string_lossy(), e))?;

        debug!("已打开文档: {}", path.display());

        Ok(Self {
            doc,
            path: path.to_path_buf(),
        })
    }

    /// 文档路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文档总页数
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// 单页文本（基于 1 的物理页号）
    ///
    /// 提取原语没有产出时返回空字符串，不报错。
    pub fn page_text(&self, page_number: u32) -> String {
        match self.doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "页 {} 文本提取为空 ({}): {}",
                    page_number,
                    self.path.display(),
                    e
                );
                String::new()
            }
        }
    }

    /// 单页内嵌图片（基于 1 的物理页号）
    ///
    /// 遍历页面资源字典的 XObject 表，收集 Subtype 为 Image 的流。
    pub fn page_images(&self, page_number: u32) -> Vec<EmbeddedImage> {
        let pages = self.doc.get_pages();
        let page_id = match pages.get(&page_number) {
            Some(id) => *id,
            None => return Vec::new(),
        };

        let (direct, inherited) = match self.doc.get_page_resources(page_id) {
            Ok(resources) => resources,
            Err(_) => return Vec::new(),
        };

        let mut resource_dicts: Vec<&Dictionary> = Vec::new();
        if let Some(dict) = direct {
            resource_dicts.push(dict);
        }
        for id in inherited {
            if let Ok(dict) = self.doc.get_object(id).and_then(Object::as_dict) {
                resource_dicts.push(dict);
            }
        }

        let mut images = Vec::new();
        for resources in resource_dicts {
            let xobjects = match resources.get(b"XObject").ok().and_then(|o| self.resolve_dict(o)) {
                Some(dict) => dict,
                None => continue,
            };

            for (name_bytes, object) in xobjects.iter() {
                let stream = match self.resolve_stream(object) {
                    Some(s) => s,
                    None => continue,
                };

                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .map(|n| n == b"Image".as_slice())
                    .unwrap_or(false);
                if !is_image {
                    continue;
                }

                let xobject_name = String::from_utf8_lossy(name_bytes);
                let extension = image_extension(&stream.dict);
                images.push(EmbeddedImage {
                    name: format!("{}.{}", xobject_name, extension),
                    data: stream.content.clone(),
                });
            }
        }

        images
    }

    /// 解引用到字典（最多跟一层引用）
    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        match object {
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_dict().ok()),
            other => other.as_dict().ok(),
        }
    }

    /// 解引用到流（最多跟一层引用）
    fn resolve_stream<'a>(&'a self, object: &'a Object) -> Option<&'a lopdf::Stream> {
        match object {
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_stream().ok()),
            other => other.as_stream().ok(),
        }
    }
}

/// 按流的 Filter 推断文件扩展名
fn image_extension(dict: &Dictionary) -> &'static str {
    let filter_name = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        // Filter 数组时以最后一个编码为准
        Ok(Object::Array(filters)) => filters.last().and_then(|o| o.as_name().ok()),
        _ => None,
    };

    match filter_name {
        Some(n) if n == b"DCTDecode".as_slice() => "jpg",
        Some(n) if n == b"JPXDecode".as_slice() => "jp2",
        Some(n) if n == b"CCITTFaxDecode".as_slice() => "tif",
        Some(n) if n == b"JBIG2Decode".as_slice() => "jb2",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_document_fails() {
        let result = PdfDocument::open("no_such_file.pdf");
        assert!(result.is_err());
    }

    #[test]
    fn test_image_extension_from_filter() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        assert_eq!(image_extension(&dict), "jpg");

        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            Object::Array(vec![
                Object::Name(b"FlateDecode".to_vec()),
                Object::Name(b"DCTDecode".to_vec()),
            ]),
        );
        assert_eq!(image_extension(&dict), "jpg");

        let dict = Dictionary::new();
        assert_eq!(image_extension(&dict), "bin");
    }
}

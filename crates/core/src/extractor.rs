use crate::error::{ExtractError, Result};
use crate::models::TextBuckets;
use crate::normalizer::{clean, detect_script, reshape_for_display, Script};
use crate::tables::{group_grids, RawGrid, Table};
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// A text primitive as produced by the page parser. `text` is `None` when the
/// parser returned a block without a text payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub text: Option<String>,
}

impl RawBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawImageData {
    Encoded(Vec<u8>),
    Samples {
        width: u32,
        height: u32,
        channels: u8,
        bytes: Vec<u8>,
    },
    Undecodable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub page: u32,
    pub index: u32,
    pub data: RawImageData,
}

impl RawImage {
    pub fn to_bitmap(&self) -> Result<DynamicImage> {
        match &self.data {
            RawImageData::Encoded(bytes) => Ok(image::load_from_memory(bytes)?),
            RawImageData::Samples {
                width,
                height,
                channels,
                bytes,
            } => samples_to_bitmap(*width, *height, *channels, bytes),
            RawImageData::Undecodable(reason) => Err(ExtractError::Image(reason.clone())),
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let bitmap = self.to_bitmap()?;
        let mut png = std::io::Cursor::new(Vec::new());
        bitmap.write_to(&mut png, image::ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}

fn samples_to_bitmap(width: u32, height: u32, channels: u8, bytes: &[u8]) -> Result<DynamicImage> {
    let channels = channels as usize;
    let needed = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or_else(|| {
            ExtractError::Image(format!("{width}x{height} with {channels} channel(s) overflows"))
        })?;
    if channels == 0 || bytes.len() < needed {
        return Err(ExtractError::Image(format!(
            "{} sample bytes cannot fill {width}x{height} with {channels} channel(s)",
            bytes.len()
        )));
    }
    let bytes = &bytes[..needed];
    let short = || ExtractError::Image(format!("sample buffer too short for {width}x{height}"));

    let bitmap = match channels {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, bytes.to_vec()).ok_or_else(short)?),
        2 => DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_raw(width, height, bytes.to_vec()).ok_or_else(short)?,
        ),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, bytes.to_vec()).ok_or_else(short)?),
        // CMYK, plus any extra spot or alpha channels which are dropped.
        _ => {
            let rgb = bytes
                .chunks_exact(channels)
                .flat_map(|pixel| cmyk_to_rgb([pixel[0], pixel[1], pixel[2], pixel[3]]))
                .collect::<Vec<_>>();
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, rgb).ok_or_else(short)?)
        }
    };

    Ok(bitmap)
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let white = 255 - u16::from(k);
    [c, m, y].map(|ink| ((255 - u16::from(ink)) * white / 255) as u8)
}

pub trait PageSource {
    fn pages(&self) -> Vec<u32>;

    fn text_blocks(&self, page: u32) -> Result<Vec<RawBlock>>;

    fn table_grids(&self, page: u32) -> Result<Vec<RawGrid>>;

    fn images(&self, page: u32) -> Result<Vec<RawImage>>;
}

pub fn extract_text(source: &dyn PageSource) -> TextBuckets {
    let mut buckets = TextBuckets::default();

    for page in source.pages() {
        let blocks = match source.text_blocks(page) {
            Ok(blocks) => blocks,
            Err(error) => {
                warn!(page, %error, "skipping page text");
                continue;
            }
        };

        for block in blocks {
            let Some(raw) = block.text else {
                continue;
            };
            let cleaned = clean(&raw);
            if cleaned.is_empty() {
                continue;
            }

            match detect_script(&cleaned) {
                Script::Arabic => buckets.arabic.push(reshape_for_display(&cleaned)),
                Script::Other => buckets.english.push(cleaned),
            }
        }
    }

    buckets
}

pub fn extract_tables(source: &dyn PageSource) -> Vec<Table> {
    let mut tables = Vec::new();

    for page in source.pages() {
        match source.table_grids(page) {
            Ok(grids) => tables.extend(grids.into_iter().map(Table::from_grid)),
            Err(error) => debug!(page, %error, "table extraction failed, page skipped"),
        }
    }

    tables
}

pub struct LopdfSource {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfSource {
    pub fn load(path: &Path) -> Result<Self> {
        let document = Document::load(path)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        let pages = document.get_pages();
        Self { document, pages }
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or_else(|| ExtractError::PdfParse(format!("page {page} does not exist")))
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        match object {
            Object::Reference(id) => Ok(self.document.get_object(*id)?),
            other => Ok(other),
        }
    }

    fn page_resources(&self, page_id: ObjectId) -> Result<Option<&Dictionary>> {
        const MAX_DEPTH: usize = 32;
        let mut node = self.document.get_dictionary(page_id)?;

        for _ in 0..MAX_DEPTH {
            if let Ok(resources) = node.get(b"Resources") {
                return Ok(Some(self.resolve(resources)?.as_dict()?));
            }
            match node.get(b"Parent") {
                Ok(Object::Reference(parent)) => node = self.document.get_dictionary(*parent)?,
                _ => return Ok(None),
            }
        }

        Ok(None)
    }

    fn positioned_text(&self, page_id: ObjectId) -> Result<Vec<PositionedText>> {
        let content = self.document.get_and_decode_page_content(page_id)?;
        let mut items = Vec::new();
        let mut state = TextCursor::default();

        for operation in &content.operations {
            let operands = &operation.operands;
            match operation.operator.as_str() {
                "BT" => state = TextCursor::default(),
                "Tm" if operands.len() == 6 => {
                    state.line = (number(&operands[4]), number(&operands[5]));
                }
                "Td" | "TD" if operands.len() == 2 => {
                    state.line.0 += number(&operands[0]);
                    state.line.1 += number(&operands[1]);
                    if operation.operator == "TD" {
                        state.leading = -number(&operands[1]);
                    }
                }
                "TL" if operands.len() == 1 => state.leading = number(&operands[0]),
                "T*" => state.line.1 -= state.leading,
                "Tj" | "'" | "\"" | "TJ" => {
                    if operation.operator != "Tj" && operation.operator != "TJ" {
                        state.line.1 -= state.leading;
                    }
                    let text = operands.iter().map(operand_text).collect::<String>();
                    push_positioned(&mut items, state.line, text);
                }
                _ => {}
            }
        }

        Ok(items)
    }

    fn image_for(&self, page: u32, index: u32, object: &Object) -> Result<Option<RawImage>> {
        let stream = self.resolve(object)?.as_stream()?;
        if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image") {
            return Ok(None);
        }

        let data = self
            .image_data(stream)
            .unwrap_or_else(|error| RawImageData::Undecodable(error.to_string()));
        Ok(Some(RawImage { page, index, data }))
    }

    fn image_data(&self, stream: &Stream) -> Result<RawImageData> {
        let dict = &stream.dict;
        let filters = stream_filters(dict);
        if filters.iter().any(|filter| filter == "DCTDecode") {
            if filters.len() == 1 {
                return Ok(RawImageData::Encoded(stream.content.clone()));
            }
            return Err(ExtractError::Image(format!("unsupported filter chain {filters:?}")));
        }

        let bits = dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
        if bits != 8 {
            return Err(ExtractError::Image(format!("unsupported {bits} bits per component")));
        }
        let bytes = if filters.is_empty() {
            stream.content.clone()
        } else {
            stream.decompressed_content()?
        };

        Ok(RawImageData::Samples {
            width: dimension(dict, b"Width")?,
            height: dimension(dict, b"Height")?,
            channels: self.color_components(dict)?,
            bytes,
        })
    }

    fn color_components(&self, dict: &Dictionary) -> Result<u8> {
        let space = match dict.get(b"ColorSpace") {
            Ok(space) => self.resolve(space)?,
            Err(_) => return Ok(1),
        };

        let (family, params) = match space {
            Object::Name(name) => (name.as_slice(), None),
            Object::Array(items) => match items.first() {
                Some(Object::Name(name)) => (name.as_slice(), items.get(1)),
                _ => return Err(ExtractError::Image("malformed color space".to_string())),
            },
            _ => return Err(ExtractError::Image("malformed color space".to_string())),
        };

        match family {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
            b"DeviceCMYK" | b"CMYK" => Ok(4),
            b"ICCBased" => {
                let profile = params
                    .ok_or_else(|| ExtractError::Image("ICCBased without profile".to_string()))?;
                let components = self
                    .resolve(profile)?
                    .as_stream()?
                    .dict
                    .get(b"N")
                    .and_then(Object::as_i64)?;
                u8::try_from(components)
                    .map_err(|_| ExtractError::Image(format!("{components} color components")))
            }
            other => Err(ExtractError::Image(format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

impl PageSource for LopdfSource {
    fn pages(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    fn text_blocks(&self, page: u32) -> Result<Vec<RawBlock>> {
        self.page_id(page)?;
        let text = self.document.extract_text(&[page])?;
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(RawBlock::text)
            .collect())
    }

    fn table_grids(&self, page: u32) -> Result<Vec<RawGrid>> {
        let mut items = self.positioned_text(self.page_id(page)?)?;
        items.sort_by(|left, right| {
            right
                .y
                .total_cmp(&left.y)
                .then_with(|| left.x.total_cmp(&right.x))
        });

        let mut rows: Vec<(f32, Vec<PositionedText>)> = Vec::new();
        for item in items {
            match rows.last_mut() {
                Some((baseline, row)) if (*baseline - item.y).abs() <= BASELINE_TOLERANCE => {
                    row.push(item)
                }
                _ => rows.push((item.y, vec![item])),
            }
        }

        Ok(group_grids(rows.into_iter().map(|(_, row)| {
            row.into_iter()
                .map(|item| {
                    let cell = item.text.trim().to_string();
                    (!cell.is_empty()).then_some(cell)
                })
                .collect()
        })))
    }

    fn images(&self, page: u32) -> Result<Vec<RawImage>> {
        let Some(resources) = self.page_resources(self.page_id(page)?)? else {
            return Ok(Vec::new());
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (_name, object) in self.resolve(xobjects)?.as_dict()?.iter() {
            let index = images.len() as u32 + 1;
            match self.image_for(page, index, object) {
                Ok(Some(image)) => {
                    if let RawImageData::Undecodable(reason) = &image.data {
                        debug!(page, index, %reason, "image kept without pixels");
                    }
                    images.push(image);
                }
                Ok(None) => {}
                Err(error) => warn!(page, %error, "unreadable xobject"),
            }
        }

        Ok(images)
    }
}

const BASELINE_TOLERANCE: f32 = 2.0;

#[derive(Debug, Default)]
struct TextCursor {
    line: (f32, f32),
    leading: f32,
}

#[derive(Debug, Clone)]
struct PositionedText {
    x: f32,
    y: f32,
    text: String,
}

fn push_positioned(items: &mut Vec<PositionedText>, (x, y): (f32, f32), text: String) {
    if let Some(last) = items.last_mut() {
        if last.x == x && last.y == y {
            last.text.push_str(&text);
            return;
        }
    }
    items.push(PositionedText { x, y, text });
}

fn number(object: &Object) -> f32 {
    match object {
        Object::Integer(value) => *value as f32,
        Object::Real(value) => *value as f32,
        _ => 0.0,
    }
}

/// Best-effort decoding of a string operand: UTF-16BE when it carries a BOM,
/// Latin-1 otherwise. Kerning arrays (`TJ`) are flattened.
fn operand_text(object: &Object) -> String {
    match object {
        Object::String(bytes, _) => {
            if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
                let units = utf16
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect::<Vec<_>>();
                String::from_utf16_lossy(&units)
            } else {
                bytes.iter().map(|byte| char::from(*byte)).collect()
            }
        }
        Object::Array(items) => items.iter().map(operand_text).collect(),
        _ => String::new(),
    }
}

fn stream_filters(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32> {
    let value = dict.get(key).and_then(Object::as_i64)?;
    u32::try_from(value).map_err(|_| {
        ExtractError::Image(format!(
            "invalid {} {value}",
            String::from_utf8_lossy(key)
        ))
    })
}

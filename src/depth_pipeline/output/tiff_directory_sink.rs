use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use tiff::encoder::colortype::{ColorType, Gray16, Gray8, RGB8};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, TiffValue};
use tiff::tags::Predictor;
use tracing::{debug, info, instrument};

use crate::depth_pipeline::common::error::{ConversionError, Result};
use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::output::sink::FrameSink;
use crate::depth_pipeline::output::types::{CameraIntrinsics, FrameRecord, SinkOptions, TiffCompression};

pub const INTRINSICS_FILE: &str = "camera_intrinsic.json";

/// Writes `image/`, `depth/` and optionally `right/` TIFF sequences under
/// one root, named `<index>-<timestamp>.tiff`.
pub struct TiffDirectorySink {
    root: PathBuf,
    options: SinkOptions,
    frames_written: u64,
}

impl TiffDirectorySink {
    pub fn create<P: AsRef<Path>>(root: P, options: SinkOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut dirs = vec!["image", "depth"];
        if options.write_right {
            dirs.push("right");
        }
        for dir in dirs {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| {
                ConversionError::OutputWriteError(format!("{}: {}", path.display(), e))
            })?;
        }
        info!(output = %root.display(), "Output directories ready");
        Ok(Self {
            root,
            options,
            frames_written: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frame_file_name(index: u64, timestamp_ms: u64) -> String {
        format!("{:06}-{:06}.tiff", index, timestamp_ms)
    }

    fn compression(&self) -> Compression {
        match self.options.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        }
    }

    fn encode<C>(&self, path: &Path, width: usize, height: usize, data: &[C::Inner]) -> Result<()>
    where
        C: ColorType,
        [C::Inner]: TiffValue,
    {
        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| ConversionError::EncodeError(e.to_string()))?
            .with_compression(self.compression());

        if let Some(predictor) = self.options.predictor {
            encoder = encoder.with_predictor(match predictor {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            });
        }

        encoder
            .write_image::<C>(width as u32, height as u32, data)
            .map_err(|e| ConversionError::EncodeError(format!("{}: {}", path.display(), e)))?;

        fs::write(path, &buffer)
            .map_err(|e| ConversionError::OutputWriteError(format!("{}: {}", path.display(), e)))
    }

    fn encode_picture(&self, path: &Path, picture: &Raster<u8>) -> Result<()> {
        let (width, height) = picture.dimensions();
        match picture.channels() {
            1 => self.encode::<Gray8>(path, width, height, picture.data()),
            3 => self.encode::<RGB8>(path, width, height, picture.data()),
            n => Err(ConversionError::UnsupportedFormatError(format!(
                "cannot store {}-channel picture",
                n
            ))),
        }
    }
}

impl FrameSink for TiffDirectorySink {
    fn write_intrinsics(&mut self, intrinsics: &CameraIntrinsics) -> Result<()> {
        let path = self.root.join(INTRINSICS_FILE);
        let file = File::create(&path)
            .map_err(|e| ConversionError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, intrinsics)?;
        writer
            .flush()
            .map_err(|e| ConversionError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Wrote camera intrinsics");
        Ok(())
    }

    #[instrument(skip_all, fields(index = record.index))]
    fn write_frame(&mut self, record: &FrameRecord<'_>) -> Result<()> {
        let name = Self::frame_file_name(record.index, record.timestamp_ms);

        self.encode_picture(&self.root.join("image").join(&name), record.color)?;
        let (width, height) = record.depth.dimensions();
        self.encode::<Gray16>(&self.root.join("depth").join(&name), width, height, record.depth.data())?;
        if self.options.write_right {
            if let Some(right) = record.right {
                self.encode_picture(&self.root.join("right").join(&name), right)?;
            }
        }

        self.frames_written += 1;
        debug!(file = %name, "Frame written");
        Ok(())
    }
}

use crate::depth_pipeline::common::error::Result;
use crate::depth_pipeline::output::types::{CameraIntrinsics, FrameRecord};

pub trait FrameSink {
    /// Called once, before the first frame.
    fn write_intrinsics(&mut self, intrinsics: &CameraIntrinsics) -> Result<()>;
    fn write_frame(&mut self, record: &FrameRecord<'_>) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn write_intrinsics(&mut self, intrinsics: &CameraIntrinsics) -> Result<()> {
        (**self).write_intrinsics(intrinsics)
    }

    fn write_frame(&mut self, record: &FrameRecord<'_>) -> Result<()> {
        (**self).write_frame(record)
    }
}

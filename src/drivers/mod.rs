// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod error;
pub mod fft;
pub mod markers;
pub mod pipeline;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::StreamBuffer;
pub use error::DecoderError;
pub use fft::{Preprocessor, SpectralBandpass};
pub use markers::{MarkerEvent, MarkerInterpreter, Phase};
pub use pipeline::{connect_streams, Decoder, Step};
pub use source::{
    CommandLog, CommandOutlet, DataInlet, ManualDataInlet, ManualMarkerInlet, MarkerInlet,
    RawMarker, SampleChunk, StaticDirectory, StreamDirectory, StreamInfo,
};

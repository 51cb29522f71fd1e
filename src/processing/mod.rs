pub mod codec_tool;
pub mod flac;
pub mod id3;

pub use codec_tool::{codec_tool, CodecTool, ToolCommand};
pub use flac::ContainerTagEmbedder;
pub use id3::embed_id3;

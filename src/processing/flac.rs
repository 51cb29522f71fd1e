use std::path::Path;
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::metadata::TaggingInput;
use crate::processing::codec_tool::CodecTool;

const INPUT_FLAC: &str = "in.flac";
const DECODED_WAV: &str = "in.wav";
const OUTPUT_FLAC: &str = "out.flac";

fn cover_file_name(input: &TaggingInput) -> Option<&'static str> {
    input
        .cover
        .as_ref()
        .map(|cover| if cover.is_png() { "cover.png" } else { "cover.jpg" })
}

/// Arguments that replace every Vorbis comment and import the cover.
pub fn metaflac_args(input: &TaggingInput, cover_file: Option<&str>, target: &str) -> Vec<String> {
    let mut args = vec!["--remove-all-tags".to_string()];
    for (key, value) in input.vorbis_fields() {
        args.push(format!("--set-tag={}={}", key, value));
    }
    if let Some(cover) = cover_file {
        args.push(format!("--import-picture-from={}", cover));
    }
    args.push(target.to_string());
    args
}

pub fn flac_decode_args(source: &str, wav: &str) -> Vec<String> {
    vec![
        "-d".to_string(),
        "-f".to_string(),
        "-o".to_string(),
        wav.to_string(),
        source.to_string(),
    ]
}

pub fn flac_encode_args(input: &TaggingInput, cover_file: Option<&str>, wav: &str, output: &str) -> Vec<String> {
    let mut args = vec!["-f".to_string(), "-o".to_string(), output.to_string()];
    for (key, value) in input.vorbis_fields() {
        args.push(format!("--tag={}={}", key, value));
    }
    if let Some(cover) = cover_file {
        args.push(format!("--picture={}", cover));
    }
    args.push(wav.to_string());
    args
}

/// Tags FLAC buffers through whichever codec tool the process resolved.
/// Scratch files live in a private temp directory that is removed on return.
pub struct ContainerTagEmbedder {
    tool: Arc<CodecTool>,
}

impl ContainerTagEmbedder {
    pub fn new(tool: Arc<CodecTool>) -> Self {
        Self { tool }
    }

    pub async fn embed(&self, audio: &[u8], input: &TaggingInput) -> Result<Vec<u8>> {
        if matches!(*self.tool, CodecTool::Unavailable) {
            return Err(AppError::NoCodecToolAvailable);
        }

        let work_dir = tempfile::tempdir()?;
        let dir = work_dir.path();
        tokio::fs::write(dir.join(INPUT_FLAC), audio).await?;

        let cover_file = cover_file_name(input);
        if let (Some(name), Some(cover)) = (cover_file, &input.cover) {
            tokio::fs::write(dir.join(name), &cover.data).await?;
        }

        let output = match &*self.tool {
            CodecTool::Primary(metaflac) => {
                if cover_file.is_some() {
                    metaflac
                        .run(
                            &[
                                "--remove".to_string(),
                                "--block-type=PICTURE".to_string(),
                                INPUT_FLAC.to_string(),
                            ],
                            dir,
                        )
                        .await?;
                }
                metaflac
                    .run(&metaflac_args(input, cover_file, INPUT_FLAC), dir)
                    .await?;
                INPUT_FLAC
            }
            CodecTool::Fallback(flac) => {
                flac.run(&flac_decode_args(INPUT_FLAC, DECODED_WAV), dir).await?;
                flac.run(&flac_encode_args(input, cover_file, DECODED_WAV, OUTPUT_FLAC), dir)
                    .await?;
                OUTPUT_FLAC
            }
            CodecTool::Unavailable => return Err(AppError::NoCodecToolAvailable),
        };

        let tagged = read_output(&dir.join(output)).await?;
        log::debug!(
            "🏷️ [FLAC] Tagged '{}' with {} ({} -> {} bytes)",
            input.title,
            self.tool.describe(),
            audio.len(),
            tagged.len()
        );
        Ok(tagged)
    }
}

async fn read_output(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(AppError::CodecTool(format!("{} is empty", path.display()))),
        Err(e) => Err(AppError::CodecTool(format!(
            "Codec tool produced no {}: {}",
            path.display(),
            e
        ))),
    }
}

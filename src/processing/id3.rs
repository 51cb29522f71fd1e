use std::io::Cursor;

use lofty::config::WriteOptions;
use lofty::file::FileType;
use lofty::id3::v2::Id3v2Tag;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, ItemValue, Tag, TagExt, TagItem, TagType};

use crate::errors::{AppError, Result};
use crate::metadata::TaggingInput;

pub const GENRE_PLACEHOLDER: &str = "Other";
pub const COVER_DESCRIPTION: &str = "Cover";
pub const LYRICS_DESCRIPTION: &str = "Lyrics";
const LYRICS_LANGUAGE: [u8; 3] = *b"eng";

/// Writes an ID3v2.3 tag in front of MPEG audio, replacing any existing ID3v2
/// tag. The audio frames are copied through untouched.
pub fn embed_id3(audio: &[u8], input: &TaggingInput) -> Result<Vec<u8>> {
    ensure_mpeg(audio)?;

    // merges the artist items into one TPE1 and turns the date into TYER on v2.3
    let tag = Id3v2Tag::from(build_tag(input));
    let mut file = Cursor::new(audio.to_vec());
    tag.save_to(&mut file, WriteOptions::default().use_id3v23(true))
        .map_err(|e| AppError::TagWrite(format!("Failed to write ID3 tag: {}", e)))?;

    let tagged = file.into_inner();
    log::debug!(
        "🏷️ [ID3] Tagged '{}' ({} -> {} bytes)",
        input.title,
        audio.len(),
        tagged.len()
    );
    Ok(tagged)
}

fn ensure_mpeg(audio: &[u8]) -> Result<()> {
    let probe = Probe::new(Cursor::new(audio))
        .guess_file_type()
        .map_err(|e| AppError::TagWrite(format!("Unreadable audio: {}", e)))?;

    match probe.file_type() {
        Some(FileType::Mpeg) => {}
        Some(other) => {
            return Err(AppError::TagWrite(format!("Expected MPEG audio, found {:?}", other)));
        }
        None => return Err(AppError::TagWrite("Input is not an MPEG stream".to_string())),
    }

    probe
        .read()
        .map_err(|e| AppError::TagWrite(format!("Malformed MPEG stream: {}", e)))?;
    Ok(())
}

fn build_tag(input: &TaggingInput) -> Tag {
    let mut tag = Tag::new(TagType::Id3v2);

    tag.set_title(input.title.clone());
    for artist in &input.artists {
        tag.push(TagItem::new(ItemKey::TrackArtist, ItemValue::Text(artist.clone())));
    }
    tag.set_album(input.album.clone());
    tag.insert_text(ItemKey::RecordingDate, input.year.to_string());
    tag.set_genre(GENRE_PLACEHOLDER.to_string());
    tag.insert_text(ItemKey::CopyrightMessage, input.copyright());

    if let Some(lyrics) = &input.lyrics {
        let mut item = TagItem::new(ItemKey::Lyrics, ItemValue::Text(lyrics.clone()));
        item.set_lang(LYRICS_LANGUAGE);
        item.set_description(LYRICS_DESCRIPTION.to_string());
        tag.push(item);
    }

    if let Some(cover) = &input.cover {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::from_str(&cover.mime_type)),
            Some(COVER_DESCRIPTION.to_string()),
            cover.data.clone(),
        ));
    }

    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CoverArtData;
    use crate::test_support::mpeg_frames;
    use lofty::file::TaggedFileExt;

    fn input(lyrics: Option<&str>, cover: Option<CoverArtData>) -> TaggingInput {
        TaggingInput {
            title: "Song".to_string(),
            artists: vec!["A".to_string(), "B".to_string()],
            artist: "A / B".to_string(),
            album: "Record".to_string(),
            year: 2024,
            lyrics: lyrics.map(str::to_string),
            cover,
        }
    }

    fn id3_len(bytes: &[u8]) -> usize {
        assert_eq!(&bytes[..3], b"ID3");
        let size = bytes[6..10]
            .iter()
            .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7F));
        let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
        10 + size + footer
    }

    fn frame_count(header: &[u8], id: &[u8; 4]) -> usize {
        header.windows(4).filter(|w| *w == id).count()
    }

    fn read_tag(bytes: &[u8]) -> Tag {
        let tagged = Probe::new(Cursor::new(bytes))
            .guess_file_type()
            .unwrap()
            .read()
            .unwrap();
        tagged.tag(TagType::Id3v2).cloned().unwrap()
    }

    #[test]
    fn audio_frames_survive_tagging() {
        let audio = mpeg_frames(24);
        let tagged = embed_id3(&audio, &input(None, None)).unwrap();

        assert!(tagged.len() >= audio.len());
        assert_eq!(tagged[3], 3, "expected ID3v2.3");
        assert_eq!(&tagged[id3_len(&tagged)..], &audio[..]);
    }

    #[test]
    fn retagging_replaces_previous_tag() {
        let audio = mpeg_frames(24);
        let once = embed_id3(&audio, &input(Some("first"), None)).unwrap();
        let twice = embed_id3(&once, &input(Some("second"), None)).unwrap();

        assert_eq!(&twice[id3_len(&twice)..], &audio[..]);
        let tag = read_tag(&twice);
        assert_eq!(tag.get_string(&ItemKey::Lyrics), Some("second"));
    }

    #[test]
    fn frames_carry_the_tagging_input() {
        let cover = CoverArtData::new(vec![0x89, b'P', b'N', b'G', 1, 2, 3], Some("image/png"));
        let tagged = embed_id3(&mpeg_frames(24), &input(Some("Hello\nWorld"), Some(cover))).unwrap();
        let tag = read_tag(&tagged);

        assert_eq!(tag.title().as_deref(), Some("Song"));
        assert_eq!(tag.get_strings(&ItemKey::TrackArtist).collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(tag.year(), Some(2024));
        assert_eq!(tag.album().as_deref(), Some("Record"));
        assert_eq!(tag.genre().as_deref(), Some(GENRE_PLACEHOLDER));
        assert_eq!(tag.get_string(&ItemKey::CopyrightMessage), Some("© 2024 A / B"));
        assert_eq!(tag.get_string(&ItemKey::Lyrics), Some("Hello\nWorld"));
        let lyrics = tag.get(&ItemKey::Lyrics).unwrap();
        assert_eq!(lyrics.lang(), b"eng");
        assert_eq!(lyrics.description(), LYRICS_DESCRIPTION);

        let pictures = tag.pictures();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].pic_type(), PictureType::CoverFront);
        assert_eq!(pictures[0].description(), Some(COVER_DESCRIPTION));
        assert_eq!(pictures[0].mime_type(), Some(&MimeType::Png));
    }

    #[test]
    fn one_artist_frame_and_one_year_frame() {
        let tagged = embed_id3(&mpeg_frames(24), &input(Some("words"), None)).unwrap();
        let header = &tagged[..id3_len(&tagged)];

        assert_eq!(frame_count(header, b"TPE1"), 1);
        assert_eq!(frame_count(header, b"TYER"), 1);
        assert_eq!(frame_count(header, b"TDRC"), 0);
        assert_eq!(frame_count(header, b"USLT"), 1);
    }

    #[test]
    fn no_cover_means_no_picture_frame() {
        let tagged = embed_id3(&mpeg_frames(24), &input(None, None)).unwrap();
        let tag = read_tag(&tagged);
        assert!(tag.pictures().is_empty());
        assert_eq!(tag.get_string(&ItemKey::Lyrics), None);
        assert!(!tagged[..id3_len(&tagged)].windows(4).any(|w| w == b"APIC"));
    }

    #[test]
    fn non_mpeg_input_is_rejected() {
        let err = embed_id3(b"this is plain text, not audio", &input(None, None)).unwrap_err();
        assert!(matches!(err, AppError::TagWrite(_)));

        let mut flac = b"fLaC".to_vec();
        flac.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            embed_id3(&flac, &input(None, None)),
            Err(AppError::TagWrite(_))
        ));
    }
}

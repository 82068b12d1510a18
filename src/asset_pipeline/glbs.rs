//! GLBS: a stream of GLB blobs behind a `GLBS` magic, each prefixed with its
//! length as a little-endian `u32`.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::CodecError;

pub const MAGIC: &[u8; 4] = b"GLBS";

pub fn encode<'a>(glbs: impl IntoIterator<Item = &'a [u8]>) -> Result<Vec<u8>, CodecError> {
    let mut out = MAGIC.to_vec();
    for glb in glbs {
        out.extend_from_slice(&length_prefix(glb)?);
        out.extend_from_slice(glb);
    }
    Ok(out)
}

pub async fn write_glbs<'a, W>(
    writer: &mut W,
    glbs: impl IntoIterator<Item = &'a [u8]>,
) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(MAGIC).await?;
    for glb in glbs {
        writer.write_all(&length_prefix(glb)?).await?;
        writer.write_all(glb).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Splits a complete GLBS buffer into its GLB entries.
pub fn split_glbs(bytes: &[u8]) -> Result<Vec<&[u8]>, CodecError> {
    let Some(mut rest) = bytes.strip_prefix(MAGIC.as_slice()) else {
        return Err(CodecError::Glbs("missing GLBS magic".to_string()));
    };

    let mut entries = Vec::new();
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(CodecError::Glbs("truncated length prefix".to_string()));
        }
        let (prefix, tail) = rest.split_at(4);
        let length = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if tail.len() < length {
            return Err(CodecError::Glbs(format!(
                "entry {} announces {} bytes but only {} remain",
                entries.len(),
                length,
                tail.len()
            )));
        }
        let (entry, tail) = tail.split_at(length);
        entries.push(entry);
        rest = tail;
    }
    Ok(entries)
}

fn length_prefix(glb: &[u8]) -> Result<[u8; 4], CodecError> {
    let length = u32::try_from(glb.len())
        .map_err(|_| CodecError::Glbs(format!("entry of {} bytes is too large", glb.len())))?;
    Ok(length.to_le_bytes())
}

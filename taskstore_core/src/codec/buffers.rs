//! Buffer-list envelope: a little-endian `u32` block count, then for each
//! block a little-endian `u64` length followed by the raw bytes.

const COUNT_LEN: usize = 4;
const LEN_LEN: usize = 8;

/// Packs the blocks into one blob. An empty list is stored as absent.
pub fn encode_buffers(bufs: &[Vec<u8>]) -> Option<Vec<u8>> {
    if bufs.is_empty() {
        return None;
    }
    let total: usize = bufs.iter().map(|b| LEN_LEN + b.len()).sum();
    let mut out = Vec::with_capacity(COUNT_LEN + total);
    out.extend_from_slice(&(bufs.len() as u32).to_le_bytes());
    for buf in bufs {
        out.extend_from_slice(&(buf.len() as u64).to_le_bytes());
        out.extend_from_slice(buf);
    }
    Some(out)
}

/// Unpacks a blob produced by `encode_buffers`; absent decodes to no blocks.
pub fn decode_buffers(blob: Option<&[u8]>) -> Result<Vec<Vec<u8>>, String> {
    let Some(mut rest) = blob else {
        return Ok(Vec::new());
    };
    let count = u32::from_le_bytes(take::<COUNT_LEN>(&mut rest, "block count")?) as usize;
    let mut bufs = Vec::with_capacity(count.min(rest.len() / LEN_LEN));
    for i in 0..count {
        let len = u64::from_le_bytes(take::<LEN_LEN>(&mut rest, "block length")?);
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= rest.len())
            .ok_or_else(|| {
                format!(
                    "Buffer block {i} declares {len} bytes but only {} remain",
                    rest.len()
                )
            })?;
        let (block, tail) = rest.split_at(len);
        bufs.push(block.to_vec());
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(format!(
            "Buffer envelope has {} trailing bytes after {count} blocks",
            rest.len()
        ));
    }
    Ok(bufs)
}

fn take<const N: usize>(rest: &mut &[u8], what: &str) -> Result<[u8; N], String> {
    if rest.len() < N {
        return Err(format!("Truncated buffer envelope while reading {what}"));
    }
    let (head, tail) = rest.split_at(N);
    *rest = tail;
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok(out)
}

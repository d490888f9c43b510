//! XOR autokey cipher used by the bulb's local protocol.
//!
//! Every byte is XORed with the previous ciphertext byte, starting from a
//! fixed key. TCP messages carry a 4-byte big-endian length prefix, UDP
//! discovery datagrams do not.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

const INITIAL_KEY: u8 = 171;

// Replies are a few KiB at most; anything larger is a broken stream.
const MAX_FRAME_SIZE: usize = 1 << 20;

pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|b| {
            key ^= b;
            key
        })
        .collect()
}

pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|b| {
            let plain = key ^ b;
            key = *b;
            plain
        })
        .collect()
}

pub fn encode_frame(plain: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(plain.len() + 4);
    frame.extend_from_slice(&(plain.len() as u32).to_be_bytes());
    frame.extend_from_slice(&encrypt(plain));
    frame
}

pub async fn write_frame<W>(writer: &mut W, plain: &[u8]) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&encode_frame(plain)).await?;
    writer.flush().await
}

pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncReadExt + Unpin,
{
    let mut len = [0u8; 4];
    reader.read_exact(&mut len).await?;
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(decrypt(&data))
}

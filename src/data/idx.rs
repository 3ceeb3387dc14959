use std::fs;
use std::path::Path;

use crate::error::{ Error, Result };


const UNSIGNED_BYTE: u8 = 0x08;


/// Decode an IDX buffer of unsigned bytes into its dimensions and payload.
///
/// The header is two zero bytes, a type code, the number of dimensions
/// and then every dimension as a big-endian `u32`.

pub fn parse(bytes: &[u8]) -> Result<(Vec<usize>, Vec<u8>)> {
  if bytes.len() < 4 {
    return Err(Error::Idx(format!("header needs 4 bytes, got {}", bytes.len())))
  }
  if bytes[0] != 0 || bytes[1] != 0 {
    return Err(Error::Idx(format!("bad magic number {:02x}{:02x}", bytes[0], bytes[1])))
  }
  if bytes[2] != UNSIGNED_BYTE {
    return Err(Error::Idx(format!("unsupported data type 0x{:02x}", bytes[2])))
  }
  let rank = bytes[3] as usize;
  let header = 4 + 4 * rank;
  if bytes.len() < header {
    return Err(Error::Idx(format!("truncated header for {rank} dimensions")))
  }
  let dims: Vec<usize> = bytes[4..header]
    .chunks_exact(4)
    .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize )
    .collect();
  let size = dims.iter()
    .try_fold(1usize, |acc, &dim| acc.checked_mul(dim) )
    .ok_or_else(|| Error::Idx(format!("dimensions {:?} overflow", dims)) )?;
  let payload = &bytes[header..];
  if payload.len() != size {
    return Err(Error::Idx(format!("dimensions {:?} need {} bytes, found {}", dims, size, payload.len())))
  }
  Ok((dims, payload.to_vec()))
}

/// Encode unsigned bytes with the given dimensions as IDX.

pub fn encode(dims: &[usize], data: &[u8]) -> Vec<u8> {
  assert_eq!(dims.iter().product::<usize>(), data.len(), "IDX dims {:?} don't match {} bytes", dims, data.len());
  let mut bytes = vec![0, 0, UNSIGNED_BYTE, dims.len() as u8];
  for &dim in dims {
    bytes.extend_from_slice(&(dim as u32).to_be_bytes());
  }
  bytes.extend_from_slice(data);
  bytes
}

pub fn read(path: impl AsRef<Path>) -> Result<(Vec<usize>, Vec<u8>)> {
  let path = path.as_ref();
  let bytes = fs::read(path).map_err(Error::file(path))?;
  log::debug!("Read {} bytes from {}", bytes.len(), path.display());
  parse(&bytes)
}

pub fn write(path: impl AsRef<Path>, dims: &[usize], data: &[u8]) -> Result<()> {
  let path = path.as_ref();
  fs::write(path, encode(dims, data)).map_err(Error::file(path))
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header() {
    let bytes = encode(&[2, 1, 3], &[1, 2, 3, 4, 5, 6]);
    assert_eq!(&bytes[..8], &[0, 0, 8, 3, 0, 0, 0, 2]);
    let (dims, data) = parse(&bytes).unwrap();
    assert_eq!(dims, vec![2, 1, 3]);
    assert_eq!(data, vec![1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn malformed() {
    assert!(matches!(parse(&[0, 0]), Err(Error::Idx(_))));
    assert!(matches!(parse(&[1, 0, 8, 1, 0, 0, 0, 0]), Err(Error::Idx(_))));
    assert!(matches!(parse(&[0, 0, 0x0D, 1, 0, 0, 0, 0]), Err(Error::Idx(_))));
    assert!(matches!(parse(&[0, 0, 8, 2, 0, 0, 0, 1]), Err(Error::Idx(_))));
    let mut truncated = encode(&[4], &[1, 2, 3, 4]);
    truncated.pop();
    assert!(matches!(parse(&truncated), Err(Error::Idx(_))));
    let mut huge = vec![0, 0, 8, 3];
    huge.extend_from_slice(&[0xff; 12]);
    assert!(matches!(parse(&huge), Err(Error::Idx(_))));
  }

  #[test]
  fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels-idx1-ubyte");
    write(&path, &[3], &[7, 0, 9]).unwrap();
    assert_eq!(read(&path).unwrap(), (vec![3], vec![7, 0, 9]));
    assert!(matches!(read(dir.path().join("missing")), Err(Error::File { .. })));
    assert!(matches!(write(dir.path().join("no/such/dir"), &[1], &[0]), Err(Error::File { .. })));
  }
}

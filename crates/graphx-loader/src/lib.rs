// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! Reads the header-prefixed binary program image described in the GraphX
//! external interfaces into a [`CsrGraph`], a program word array, and an
//! initial data memory image — everything [`graphx_core::vm::Vm::new`] needs.
//!
//! Modeled on the teacher workspace's `x86_64::bzimage` loader: validate the
//! header's declared lengths against the VM's fixed capacities before
//! copying a single byte, and turn a short read into a typed error rather
//! than a panic or a silently truncated copy.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use graphx_core::graph::{CsrGraph, GraphError};
use graphx_core::memory::DATA_MEMORY_WORDS;
use graphx_core::vm::PROGRAM_WORDS;
use remain::sorted;
use thiserror::Error;
use zerocopy::AsBytes;
use zerocopy::FromBytes;
use zerocopy::FromZeroes;

/// On-disk header: five little-endian `u32` length fields, packed with no
/// padding. Read as a byte overlay rather than byte-swapped field by field,
/// the same assumption the teacher's `bootparam`/`bzimage` on-disk structs
/// make about running on a little-endian host.
#[repr(C)]
#[derive(Default, Debug, Copy, Clone, FromZeroes, FromBytes, AsBytes)]
struct Header {
    code_len: u32,
    row_index_len: u32,
    col_index_len: u32,
    values_len: u32,
    mem_len: u32,
}

const HEADER_SIZE: usize = std::mem::size_of::<Header>();

#[sorted]
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("code_len {len} exceeds the {PROGRAM_WORDS}-word program memory")]
    CodeTooLarge { len: u32 },
    #[error("loaded CSR arrays are invalid: {0}")]
    Graph(#[from] GraphError),
    #[error("file is shorter than the {HEADER_SIZE}-byte header")]
    HeaderTooShort,
    #[error("I/O error reading program image: {0}")]
    Io(#[from] std::io::Error),
    #[error("mem_len {len} exceeds the {DATA_MEMORY_WORDS}-word data memory")]
    MemTooLarge { len: u32 },
    #[error("file ended before a declared section was fully read")]
    UnexpectedEof,
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// Everything read from a program image, ready to hand to [`graphx_core::vm::Vm::new`].
pub struct LoadedImage {
    pub graph: CsrGraph,
    pub program: Vec<u64>,
    pub initial_memory: Vec<i32>,
}

pub fn load_image_from_path(path: impl AsRef<Path>) -> Result<LoadedImage> {
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    load_image(&buf)
}

/// Parses a complete program image already read into memory.
pub fn load_image(buf: &[u8]) -> Result<LoadedImage> {
    let header_bytes = buf.get(..HEADER_SIZE).ok_or(LoadError::HeaderTooShort)?;
    let header = Header::read_from(header_bytes).ok_or(LoadError::HeaderTooShort)?;

    if header.code_len as usize > PROGRAM_WORDS {
        return Err(LoadError::CodeTooLarge { len: header.code_len });
    }
    if header.mem_len as usize > DATA_MEMORY_WORDS {
        return Err(LoadError::MemTooLarge { len: header.mem_len });
    }

    let mut cursor = HEADER_SIZE;
    let program = read_words(buf, &mut cursor, header.code_len as usize, u64::from_le_bytes)?;
    let row_index = read_words(buf, &mut cursor, header.row_index_len as usize, i32::from_le_bytes)?;
    let col_index = read_words(buf, &mut cursor, header.col_index_len as usize, i32::from_le_bytes)?;
    let values = read_words(buf, &mut cursor, header.values_len as usize, i32::from_le_bytes)?;
    let initial_memory = read_words(buf, &mut cursor, header.mem_len as usize, i32::from_le_bytes)?;

    let graph = CsrGraph::new(row_index, col_index, values)?;

    Ok(LoadedImage {
        graph,
        program,
        initial_memory,
    })
}

/// Reads `count` little-endian fixed-width words starting at `*cursor`,
/// advancing it past what was consumed. A short read anywhere is
/// [`LoadError::UnexpectedEof`], never a partial result.
fn read_words<T, const N: usize>(
    buf: &[u8],
    cursor: &mut usize,
    count: usize,
    from_le_bytes: impl Fn([u8; N]) -> T,
) -> Result<Vec<T>> {
    let bytes_needed = count.checked_mul(N).ok_or(LoadError::UnexpectedEof)?;
    let end = cursor.checked_add(bytes_needed).ok_or(LoadError::UnexpectedEof)?;
    let slice = buf.get(*cursor..end).ok_or(LoadError::UnexpectedEof)?;
    let words = slice
        .chunks_exact(N)
        .map(|chunk| from_le_bytes(chunk.try_into().expect("chunks_exact yields N bytes")))
        .collect();
    *cursor = end;
    Ok(words)
}

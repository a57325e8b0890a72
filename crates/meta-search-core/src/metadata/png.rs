use crate::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Text-chunk keyword the generation parameters are stored under.
pub const PARAMETERS_KEYWORD: &str = "parameters";

/// Upper bound on decoder allocations per file.
const DECODE_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Read the embedded parameters blob from a PNG file.
///
/// Looks at `tEXt`, `zTXt` and `iTXt` chunks that precede the image data.
/// Returns `Ok(None)` when the file decodes but carries no parameters chunk.
pub fn read_parameters(path: &Path) -> Result<Option<String>, Error> {
    let file = File::open(path).map_err(|e| decode_error(path, e))?;

    let mut decoder = ::png::Decoder::new_with_limits(
        BufReader::new(file),
        ::png::Limits {
            bytes: DECODE_LIMIT_BYTES,
        },
    );
    decoder.set_ignore_text_chunk(false);
    let reader = decoder.read_info().map_err(|e| decode_error(path, e))?;
    let info = reader.info();

    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
    {
        return Ok(Some(chunk.text.clone()));
    }

    if let Some(chunk) = info
        .compressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
    {
        let text = chunk.get_text().map_err(|e| decode_error(path, e))?;
        return Ok(Some(text));
    }

    if let Some(chunk) = info
        .utf8_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
    {
        let text = chunk.get_text().map_err(|e| decode_error(path, e))?;
        return Ok(Some(text));
    }

    Ok(None)
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

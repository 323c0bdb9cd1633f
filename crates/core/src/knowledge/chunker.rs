/// Splits `text` into pieces of `chunk_size` code points; the last one may be shorter.
///
/// Concatenating the result yields `text` again. A `chunk_size` of zero is
/// treated as one.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }
    chunks
}

//! Utility functions for Warden CLI

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

/// Print `label` and read one line. The line ending is stripped, nothing
/// else, so secrets with surrounding spaces survive.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String> {
    write!(output, "{}: ", label)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("No input for {}", label.to_lowercase());
    }

    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_strips_line_ending_only() {
        let mut input = Cursor::new(" s3cret \r\n");
        let mut output = Vec::new();

        let value = prompt(&mut input, &mut output, "Password").unwrap();

        assert_eq!(value, " s3cret ");
        assert_eq!(String::from_utf8(output).unwrap(), "Password: ");
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let mut input = Cursor::new("");
        assert!(prompt(&mut input, &mut Vec::<u8>::new(), "Username").is_err());
    }
}

//! Lenient `key=value` field scanning.
//!
//! Object files were historically written with `printf`-style format strings
//! and read back with matching scans, so a field that fails to match simply
//! stops the scan and every later field keeps its default. [`Scan`] mirrors
//! that contract: each call either consumes input and returns a value, or
//! leaves the cursor untouched and returns `None`.

/// Cursor over a single line of object text.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    rest: &'a str,
}

impl<'a> Scan<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a str {
        self.rest
    }

    /// Consumes `literal` if the remaining input starts with it.
    pub fn lit(&mut self, literal: &str) -> Option<()> {
        let rest = self.rest.strip_prefix(literal)?;
        self.rest = rest;
        Some(())
    }

    /// Reads a signed decimal integer, skipping leading whitespace.
    pub fn int(&mut self) -> Option<i32> {
        let trimmed = self.rest.trim_start();
        let bytes = trimmed.as_bytes();
        let mut end = 0;
        if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
            end += 1;
        }
        let digits_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == digits_start {
            return None;
        }
        let value = parse_saturating_i32(&trimmed[..end]);
        self.rest = &trimmed[end..];
        Some(value)
    }

    /// Reads a decimal floating point number, skipping leading whitespace.
    pub fn float(&mut self) -> Option<f64> {
        let trimmed = self.rest.trim_start();
        let bytes = trimmed.as_bytes();
        let mut end = 0;
        if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
            end += 1;
        }
        let mantissa_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let mut digits = end - mantissa_start;
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            let frac_start = end;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            digits += end - frac_start;
        }
        if digits == 0 {
            return None;
        }
        if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
            let mut exp_end = end + 1;
            if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
                exp_end += 1;
            }
            let exp_digits = exp_end;
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            if exp_end > exp_digits {
                end = exp_end;
            }
        }
        let value = trimmed[..end].parse::<f64>().ok()?;
        self.rest = &trimmed[end..];
        Some(value)
    }

    /// Reads a whitespace-delimited token of at most `max_len` bytes.
    pub fn word(&mut self, max_len: usize) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        let mut end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        if end == 0 {
            return None;
        }
        while end > max_len || !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            return None;
        }
        self.rest = &trimmed[end..];
        Some(&trimmed[..end])
    }

    /// Reads one raw character, whitespace included.
    pub fn any_char(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }

    pub fn key_int(&mut self, key: &str) -> Option<i32> {
        self.lit(key)?;
        self.int()
    }

    pub fn key_float(&mut self, key: &str) -> Option<f64> {
        self.lit(key)?;
        self.float()
    }
}

/// Reads as many `sep`-separated integers as match, starting at `line`.
pub fn int_list(line: &str, sep: &str) -> Vec<i32> {
    let mut scan = Scan::new(line);
    let mut values = Vec::new();
    if let Some(first) = scan.int() {
        values.push(first);
        while scan.lit(sep).is_some() {
            match scan.int() {
                Some(value) => values.push(value),
                None => break,
            }
        }
    }
    values
}

fn parse_saturating_i32(text: &str) -> i32 {
    match text.parse::<i64>() {
        Ok(value) => value.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        Err(_) => {
            if text.starts_with('-') {
                i32::MIN
            } else {
                i32::MAX
            }
        }
    }
}

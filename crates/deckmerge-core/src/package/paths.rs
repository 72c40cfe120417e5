//! Part-name arithmetic for OPC packages.
//!
//! Part paths are stored without a leading slash (`ppt/slides/slide1.xml`).
//! The package root is the empty path `""`; its relationships live in
//! `_rels/.rels`.

/// Path of the relationships part that belongs to `part`.
pub fn rels_path_for(part: &str) -> String {
    if part.is_empty() {
        return "_rels/.rels".to_string();
    }
    let (dir, file) = split_dir(part);
    if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    }
}

pub fn is_rels_path(path: &str) -> bool {
    path.ends_with(".rels") && (path.starts_with("_rels/") || path.contains("/_rels/"))
}

/// Inverse of [`rels_path_for`].
pub fn part_for_rels_path(rels_path: &str) -> Option<String> {
    if rels_path == "_rels/.rels" {
        return Some(String::new());
    }
    let file = rels_path.strip_suffix(".rels")?;
    let (dir, file) = split_dir(file);
    let parent_dir = if dir == "_rels" {
        ""
    } else {
        dir.strip_suffix("/_rels")?
    };
    if parent_dir.is_empty() {
        Some(file.to_string())
    } else {
        Some(format!("{parent_dir}/{file}"))
    }
}

/// Splits `a/b/c.xml` into (`a/b`, `c.xml`).
pub fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

pub fn file_name(path: &str) -> &str {
    split_dir(path).1
}

/// Lower-cased extension without the dot.
pub fn extension(path: &str) -> Option<String> {
    let file = file_name(path);
    let pos = file.rfind('.')?;
    if pos + 1 >= file.len() {
        return None;
    }
    Some(file[pos + 1..].to_ascii_lowercase())
}

/// Resolves a relationship target relative to the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or("");
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let (dir, _) = split_dir(source_part);
    if dir.is_empty() {
        normalize(target)
    } else {
        normalize(&format!("{dir}/{target}"))
    }
}

/// Relative reference from `source_part` to `target_part`, as written in a `.rels` file.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let (source_dir, _) = split_dir(source_part);
    let from: Vec<&str> = source_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target_part.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count()
        // the last target segment is the file name and never a shared directory
        .min(to.len().saturating_sub(1));

    let mut segments: Vec<&str> = Vec::new();
    segments.extend(std::iter::repeat("..").take(from.len() - common));
    segments.extend(&to[common..]);
    segments.join("/")
}

fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// Splits a numbered part name into stem, number and suffix:
/// `ppt/slides/slide12.xml` becomes (`ppt/slides/slide`, `Some(12)`, `.xml`).
pub fn split_numbered(path: &str) -> (&str, Option<u64>, &str) {
    let (dir, file) = split_dir(path);
    let dot = file.rfind('.').unwrap_or(file.len());
    let base = &file[..dot];
    let digits = base
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let stem_end = dir.len() + usize::from(!dir.is_empty()) + base.len() - digits;
    let suffix_start = dir.len() + usize::from(!dir.is_empty()) + dot;
    let number = base[base.len() - digits..].parse().ok();
    (&path[..stem_end], number, &path[suffix_start..])
}

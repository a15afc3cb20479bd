//! NHX tag dictionary and string helpers shared by the Newick parser
//! and writer.

/// Short NHX tag to long-form metadata field name.
///
/// Evaluated by lookup during parsing; the writer walks the same table in
/// order to map fields back to tags.
pub const NHX_TAGS: &[(&str, &str)] = &[
    ("S", "species"),
    ("B", "bootstrap"),
    ("T", "taxon_id"),
    ("AC", "accession"),
    ("E", "ec"),
    ("GN", "gene"),
    ("ND", "id"),
    ("N", "id"),
    ("G", "gene_id"),
    ("TR", "transcript_id"),
    ("PR", "protein_id"),
    ("PVAL", "p_value"),
];

/// Resolves a short NHX tag to its long-form field name.
pub fn long_name(tag: &str) -> Option<&'static str> {
    NHX_TAGS
        .iter()
        .find(|(short, _)| *short == tag)
        .map(|(_, long)| *long)
}

/// Replaces characters that would break the bracketed NHX syntax
/// (whitespace, parentheses, brackets, `&`, `;`, `,`) with underscores.
///
/// # Examples
/// ```
/// # use phyledit::model::meta::sanitize_nhx;
/// assert_eq!(sanitize_nhx(":S=Homo sapiens"), ":S=Homo_sapiens");
/// assert_eq!(sanitize_nhx(":note=a,b;c"), ":note=a_b_c");
/// ```
pub fn sanitize_nhx(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '&' | ';' | ',') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Uppercases the first character of a string.
///
/// # Examples
/// ```
/// # use phyledit::model::meta::capitalize;
/// assert_eq!(capitalize("homo sapiens"), "Homo sapiens");
/// assert_eq!(capitalize(""), "");
/// ```
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

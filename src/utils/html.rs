// src/utils/html.rs

/// Sanitizes user-supplied text (feedback comments, display names) with
/// ammonia's whitelist: harmless inline tags survive, `<script>`/`<style>`
/// are removed together with their content, event attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

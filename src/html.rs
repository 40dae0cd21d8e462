use super::*;

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();

    let mut stack = vec![dom.root()];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            if let Some(end) = find_subslice(bytes, i + 4, b"-->") {
                i = end + 3;
            } else {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            }
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;

                // a stray end tag with no matching open element is ignored
                let open = stack
                    .iter()
                    .skip(1)
                    .rposition(|node| dom.has_tag(*node, &tag));
                if let Some(pos) = open {
                    stack.truncate(pos + 1);
                }
                continue;
            }

            if starts_with_at(bytes, i, b"<!") {
                i = parse_declaration_tag(html, i)?;
                continue;
            }

            if !bytes
                .get(i + 1)
                .is_some_and(|next| next.is_ascii_alphabetic())
            {
                // a lone '<' is text
                let parent = current_parent(&stack)?;
                dom.create_text(parent, "<".to_string());
                i += 1;
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;
            close_optional_table_cell_start_tag(&dom, &mut stack, &tag);
            close_optional_table_row_start_tag(&dom, &mut stack, &tag);
            close_optional_table_section_start_tag(&dom, &mut stack, &tag);

            let parent = current_parent(&stack)?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_case_insensitive_raw_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    let text = if is_escapable_raw_text_tag(&tag) {
                        decode_html_character_references(body)
                    } else {
                        body.to_string()
                    };
                    if !text.is_empty() {
                        dom.create_text(node, text);
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            if !text.is_empty() {
                let parent = current_parent(&stack)?;
                let decoded = decode_html_character_references(text);
                if !decoded.is_empty() {
                    dom.create_text(parent, decoded);
                }
            }
        }
    }

    dom.normalize_implied_table_bodies()?;
    dom.rebuild_id_index();
    Ok(dom)
}

fn current_parent(stack: &[NodeId]) -> Result<NodeId> {
    stack
        .last()
        .copied()
        .ok_or_else(|| Error::HtmlParse("missing parent element".into()))
}

fn decode_html_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint =
            if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                value.parse::<u32>().ok()?
            };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "ensp" => Some('\u{2002}'),
            "emsp" => Some('\u{2003}'),
            "thinsp" => Some('\u{2009}'),
            "copy" => Some('©'),
            "reg" => Some('®'),
            "deg" => Some('°'),
            "plusmn" => Some('±'),
            "middot" => Some('·'),
            "hellip" => Some('…'),
            "larr" => Some('←'),
            "rarr" => Some('→'),
            "uarr" => Some('↑'),
            "darr" => Some('↓'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let entity = tail
            .find(';')
            .filter(|end| {
                *end > 0
                    && tail[..*end]
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '#')
            })
            .and_then(|end| {
                let raw = &tail[..end];
                let decoded = match raw.strip_prefix('#') {
                    Some(number) => decode_numeric(number),
                    None => decode_named(raw),
                };
                decoded.map(|ch| (ch, end))
            });

        match entity {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn close_optional_table_cell_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !matches!(tag, "td" | "th" | "tr" | "tbody" | "thead" | "tfoot") {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag.eq_ignore_ascii_case("td") || open_tag.eq_ignore_ascii_case("th") {
            close_index = Some(index);
            break;
        }
        if open_tag.eq_ignore_ascii_case("tr") || open_tag.eq_ignore_ascii_case("table") {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_table_row_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !matches!(tag, "tr" | "tbody" | "thead" | "tfoot") {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag.eq_ignore_ascii_case("tr") {
            close_index = Some(index);
            break;
        }
        if is_table_section_tag(open_tag) || open_tag.eq_ignore_ascii_case("table") {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_table_section_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !is_table_section_tag(tag) {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if is_table_section_tag(open_tag) {
            close_index = Some(index);
            break;
        }
        if open_tag.eq_ignore_ascii_case("table") {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn is_table_section_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("tbody")
        || tag.eq_ignore_ascii_case("thead")
        || tag.eq_ignore_ascii_case("tfoot")
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style") || is_escapable_raw_text_tag(tag)
}

fn is_escapable_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "textarea" | "title")
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, HashMap<String, String>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs = HashMap::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}")));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
            self_closing = true;
            i += 2;
            break;
        }

        if !is_attr_name_char(bytes[i]) {
            // skip junk such as a stray quote between attributes
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'>'
                && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
            {
                i += 1;
            }
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);

        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        attrs.entry(name).or_insert(value);
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_declaration_tag(html: &str, at: usize) -> Result<usize> {
    let bytes = html.as_bytes();
    if !(bytes.get(at) == Some(&b'<') && bytes.get(at + 1) == Some(&b'!')) {
        return Err(Error::HtmlParse("expected declaration tag".into()));
    }
    find_subslice(bytes, at + 2, b">")
        .map(|end| end + 1)
        .ok_or_else(|| Error::HtmlParse("unclosed declaration tag".into()))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
        *i += 1;
        return Ok(decode_html_character_references(value));
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>'))
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
    Ok(decode_html_character_references(value))
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window == needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn find_case_insensitive_raw_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let tag_end = j + tag.len();
            if tag_end <= bytes.len() && bytes[j..tag_end].eq_ignore_ascii_case(tag) {
                if tag_end >= bytes.len() || !bytes[tag_end].is_ascii_alphanumeric() {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_table(dom: &Dom) -> NodeId {
        let mut tables = Vec::new();
        dom.collect_elements_dfs(dom.root(), &mut tables);
        tables.retain(|node| dom.has_tag(*node, "table"));
        assert_eq!(tables.len(), 1, "expected exactly one table");
        tables[0]
    }

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(
            decode_html_character_references("a &amp; b &lt;c&gt; &#65;&#x42; &bogus; &"),
            "a & b <c> AB &bogus; &"
        );
    }

    #[test]
    fn rows_without_tbody_get_an_implied_body() -> Result<()> {
        let dom = parse_html("<table id='t'><tr><th>a</th></tr><tr><td>1</td></tr></table>")?;
        let table = only_table(&dom);
        let bodies = dom.t_bodies(table);
        assert_eq!(bodies.len(), 1);
        assert_eq!(dom.child_elements(bodies[0]).len(), 2);
        assert_eq!(dom.by_id("t"), Some(table));
        Ok(())
    }

    #[test]
    fn unclosed_cells_and_rows_are_closed_implicitly() -> Result<()> {
        let dom = parse_html("<table><tr><td>a<td>b<tr><td>c<td>d</table><p id='after'>x</p>")?;
        let table = only_table(&dom);
        let body = dom.t_bodies(table)[0];
        let rows = dom.child_elements(body);
        assert_eq!(rows.len(), 2);
        assert_eq!(dom.elements_by_tag_name(rows[0], "td").len(), 2);
        assert_eq!(dom.text_content(rows[1]), "cd");
        let after = dom.by_id("after").ok_or_else(|| Error::MissingElement("after".into()))?;
        assert_eq!(dom.parent(after), Some(dom.root()));
        Ok(())
    }

    #[test]
    fn explicit_sections_are_kept() -> Result<()> {
        let dom = parse_html(
            "<table><thead><tr><th>h</th></tr><tbody><tr><td>1</td></tr></tbody></table>",
        )?;
        let table = only_table(&dom);
        let sections = dom
            .child_elements(table)
            .into_iter()
            .filter_map(|node| dom.tag_name(node).map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(sections, vec!["thead", "tbody"]);
        Ok(())
    }

    #[test]
    fn script_body_is_raw_text() -> Result<()> {
        let dom = parse_html("<script>if (a < b) { x = '<td>'; }</script><div>ok</div>")?;
        let mut all = Vec::new();
        dom.collect_elements_dfs(dom.root(), &mut all);
        assert!(dom.elements_by_tag_name(dom.root(), "td").is_empty());
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[test]
    fn reports_unclosed_comment_and_attribute() {
        assert_eq!(
            parse_html("<div><!-- open").unwrap_err(),
            Error::HtmlParse("unclosed HTML comment".into())
        );
        assert_eq!(
            parse_html("<div title=\"open></div>").unwrap_err(),
            Error::HtmlParse("unclosed quoted attribute value".into())
        );
    }

    #[test]
    fn doctype_and_void_elements() -> Result<()> {
        let dom = parse_html("<!DOCTYPE html><html><body><br><input id=q value=1><p>t</p></body></html>")?;
        let input = dom.by_id("q").ok_or_else(|| Error::MissingElement("q".into()))?;
        assert_eq!(dom.attr(input, "value"), Some("1"));
        assert!(dom.children(input).is_empty());
        Ok(())
    }
}

use crate::domain::model::{Field, Order, Record, Suborder};
use crate::utils::error::{HoldError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

/// 解析訂單檔案：根元素底下每個子元素是一筆子訂單，子訂單底下是葉節點欄位
pub fn parse_order(file_name: &str, order_number: &str, text: &str) -> Result<Order> {
    let mut reader = Reader::from_str(text);

    let mut xml_declaration = false;
    let mut root: Option<(String, Vec<(String, String)>)> = None;
    let mut records: Vec<Record> = Vec::new();
    let mut current: Option<Record> = None;
    let mut field: Option<Field> = None;
    // 尚未歸屬到下一個節點的註解
    let mut comments: Vec<String> = Vec::new();
    let mut prolog_comments: Vec<String> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Decl(_) => xml_declaration = true,
            Event::Start(start) => {
                let name = element_name(&start);
                match depth {
                    0 if root.is_some() => {
                        return Err(HoldError::malformed(file_name, "more than one root element"));
                    }
                    0 => {
                        prolog_comments = std::mem::take(&mut comments);
                        root = Some((name, attributes(&start)?));
                    }
                    1 => current = Some(open_record(name, &start, &mut comments)?),
                    2 => field = Some(open_field(name, &start, &mut comments)?),
                    _ => {
                        return Err(HoldError::malformed(
                            file_name,
                            format!("unexpected nested element <{}>", name),
                        ));
                    }
                }
                depth += 1;
            }
            Event::Empty(start) => {
                let name = element_name(&start);
                match (depth, current.as_mut()) {
                    (0, _) => {
                        return Err(HoldError::malformed(file_name, "root element is empty"));
                    }
                    (1, _) => records.push(open_record(name, &start, &mut comments)?),
                    (2, Some(record)) => record.fields.push(open_field(name, &start, &mut comments)?),
                    _ => {
                        return Err(HoldError::malformed(
                            file_name,
                            format!("unexpected nested element <{}/>", name),
                        ));
                    }
                }
            }
            Event::Text(content) => {
                let value = content.unescape()?.into_owned();
                append_text(file_name, depth, field.as_mut(), &value)?;
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data).into_owned();
                append_text(file_name, depth, field.as_mut(), &value)?;
            }
            Event::Comment(comment) => {
                let comment = String::from_utf8_lossy(&comment).into_owned();
                match field.as_mut() {
                    // 欄位內的註解寫回時放在欄位前
                    Some(open) => open.comments.push(comment),
                    None => comments.push(comment),
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    2 => {
                        if let (Some(record), Some(done)) = (current.as_mut(), field.take()) {
                            record.fields.push(done);
                        }
                    }
                    1 => {
                        if let Some(mut record) = current.take() {
                            record.trailing_comments = std::mem::take(&mut comments);
                            records.push(record);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(HoldError::malformed(file_name, "unexpected end of document"));
    }
    let (root_tag, root_attributes) =
        root.ok_or_else(|| HoldError::malformed(file_name, "no root element"))?;
    if records.is_empty() {
        return Err(HoldError::malformed(file_name, "no order records"));
    }

    Ok(Order {
        order_number: order_number.to_string(),
        file_name: file_name.to_string(),
        root_tag,
        root_attributes,
        xml_declaration,
        prolog_comments,
        suborders: records.iter().map(Suborder::from_record).collect(),
        trailing_comments: comments,
    })
}

fn open_record(name: String, start: &BytesStart<'_>, comments: &mut Vec<String>) -> Result<Record> {
    let mut record = Record::new(name);
    record.attributes = attributes(start)?;
    record.comments = std::mem::take(comments);
    Ok(record)
}

fn open_field(name: String, start: &BytesStart<'_>, comments: &mut Vec<String>) -> Result<Field> {
    let mut field = Field::new(name, None);
    field.attributes = attributes(start)?;
    field.comments = std::mem::take(comments);
    Ok(field)
}

fn append_text(file_name: &str, depth: usize, field: Option<&mut Field>, value: &str) -> Result<()> {
    match (depth, field) {
        (3, Some(field)) => {
            field.value.get_or_insert_with(String::new).push_str(value);
            Ok(())
        }
        _ if value.trim().is_empty() => Ok(()),
        _ => Err(HoldError::malformed(
            file_name,
            format!("unexpected text '{}' outside a field", value.trim()),
        )),
    }
}

fn start_tag<'a>(name: &'a str, attributes: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

fn write_comments(writer: &mut Writer<Vec<u8>>, comments: &[String]) -> Result<()> {
    for comment in comments {
        writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
    }
    Ok(())
}

/// 將整份訂單重新序列化；欄位順序、屬性與註解沿用原檔
pub fn render_order(order: &Order) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    if order.xml_declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }

    write_comments(&mut writer, &order.prolog_comments)?;
    writer.write_event(Event::Start(start_tag(&order.root_tag, &order.root_attributes)))?;

    for suborder in &order.suborders {
        let record = suborder.to_record();
        write_comments(&mut writer, &record.comments)?;
        writer.write_event(Event::Start(start_tag(&record.tag, &record.attributes)))?;
        for field in &record.fields {
            write_comments(&mut writer, &field.comments)?;
            let start = start_tag(&field.name, &field.attributes);
            match &field.value {
                Some(value) => {
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(value)))?;
                    writer.write_event(Event::End(BytesEnd::new(field.name.as_str())))?;
                }
                None => writer.write_event(Event::Empty(start))?,
            }
        }
        write_comments(&mut writer, &record.trailing_comments)?;
        writer.write_event(Event::End(BytesEnd::new(record.tag.as_str())))?;
    }

    write_comments(&mut writer, &order.trailing_comments)?;
    writer.write_event(Event::End(BytesEnd::new(order.root_tag.as_str())))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<orders source="export">
  <import_ca>
    <orderid>A100</orderid>
    <firstname>Ann</firstname>
    <lastname>Lee</lastname>
    <shipvia/>
    <scountry>US</scountry>
    <custom01>Leave at door &amp; ring</custom01>
    <product01>19PS01</product01>
    <quantity01>1.0000</quantity01>
    <product02></product02>
  </import_ca>
  <import_ca>
    <orderid>A100</orderid>
    <product01>04HS90</product01>
  </import_ca>
</orders>
"#;

    #[test]
    fn test_parse_order_reads_all_suborders() {
        let order = parse_order("A100.xml", "A100", SAMPLE).unwrap();

        assert_eq!(order.root_tag, "orders");
        assert_eq!(order.root_attributes, vec![("source".to_string(), "export".to_string())]);
        assert!(order.xml_declaration);
        assert_eq!(order.suborders.len(), 2);

        let first = &order.suborders[0];
        assert_eq!(first.firstname.as_deref(), Some("Ann"));
        assert_eq!(first.shipvia, None);
        assert_eq!(first.custom01.as_deref(), Some("Leave at door & ring"));
        assert_eq!(first.product_codes(), vec!["19PS01"]);
        assert_eq!(first.extra("orderid"), Some("A100"));
        assert_eq!(order.all_product_codes(), vec!["19PS01", "04HS90"]);
    }

    #[test]
    fn test_render_then_parse_keeps_shape() {
        let mut order = parse_order("A100.xml", "A100", SAMPLE).unwrap();
        order.suborders[0].shipvia = Some("UG".to_string());

        let rendered = render_order(&order).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("<shipvia>UG</shipvia>"));
        assert!(text.contains("&amp; ring"));
        assert!(text.contains("<product02/>"));

        let reparsed = parse_order("A100.xml", "A100", &text).unwrap();
        assert_eq!(reparsed.suborders.len(), 2);
        assert_eq!(reparsed.suborders[0].shipvia.as_deref(), Some("UG"));
        assert_eq!(render_order(&reparsed).unwrap(), text.into_bytes());
    }

    #[test]
    fn test_rewrite_keeps_attributes_comments_and_whitespace() {
        let text = r#"<!-- export v2 -->
<orders>
  <import_ca id="7">
    <!-- keep -->
    <custom01>  </custom01>
    <product01 sku="x">A1</product01>
    <product02 kind="empty"/>
    <!-- tail -->
  </import_ca>
  <!-- end -->
</orders>
"#;
        let mut order = parse_order("A1.xml", "A1", text).unwrap();
        assert_eq!(order.suborders[0].custom01.as_deref(), Some("  "));

        order.suborders[0].holddate = Some("2030-10-19".to_string());
        let rendered = String::from_utf8(render_order(&order).unwrap()).unwrap();

        assert!(rendered.starts_with("<!-- export v2 -->"));
        assert!(rendered.contains(r#"<import_ca id="7">"#));
        assert!(rendered.contains("<!-- keep -->"));
        assert!(rendered.contains("<custom01>  </custom01>"));
        assert!(rendered.contains(r#"<product01 sku="x">A1</product01>"#));
        assert!(rendered.contains(r#"<product02 kind="empty"/>"#));
        assert!(rendered.contains("<holddate>2030-10-19</holddate>"));
        let tail = rendered.find("<!-- tail -->").unwrap();
        assert!(tail < rendered.find("</import_ca>").unwrap());
        let end = rendered.find("<!-- end -->").unwrap();
        assert!(end > rendered.find("</import_ca>").unwrap());
        assert!(end < rendered.find("</orders>").unwrap());
    }

    #[test]
    fn test_parse_rejects_nested_fields() {
        let text = "<orders><import_ca><product01><x>1</x></product01></import_ca></orders>";
        let err = parse_order("bad.xml", "bad", text).unwrap_err();
        assert!(matches!(err, HoldError::MalformedRecord { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_root() {
        let err = parse_order("bad.xml", "bad", "<orders></orders>").unwrap_err();
        assert!(err.to_string().contains("no order records"));
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        assert!(parse_order("bad.xml", "bad", "<orders><import_ca><shipvia>UG").is_err());
    }
}

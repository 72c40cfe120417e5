//! The `c:strCache` / `c:numCache` copies of chart data kept inside chart XML.

use super::{cell_ref, format_number, ChartCategory, ChartData, ChartSeries};
use crate::error::{DeckMergeError, Result};
use crate::xml::namespaces::{C, C16};
use crate::xml::{XAttribute, XName, XmlDocument, XmlNodeData};
use indextree::NodeId;

/// Sheet named by the first formula in the chart, if any.
pub fn sheet_name(doc: &XmlDocument) -> Option<String> {
    let root = doc.root()?;
    doc.descendants_named(root, &C::f())
        .into_iter()
        .map(|f| doc.text(f))
        .find_map(|formula| {
            let (sheet, _) = formula.split_once('!')?;
            let sheet = sheet.trim_matches('\'').replace("''", "'");
            (!sheet.is_empty()).then_some(sheet)
        })
}

fn quoted_sheet(sheet: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

fn absolute(cell: &str) -> String {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    format!("${}${}", &cell[..split], &cell[split..])
}

fn range_formula(sheet: &str, first: (usize, usize), last: (usize, usize)) -> String {
    let start = absolute(&cell_ref(first.0, first.1));
    if first == last {
        return format!("{}!{start}", quoted_sheet(sheet));
    }
    let end = absolute(&cell_ref(last.0, last.1));
    format!("{}!{start}:{end}", quoted_sheet(sheet))
}

fn val_attr(value: usize) -> Vec<XAttribute> {
    vec![XAttribute::new(XName::local("val"), &value.to_string())]
}

fn set_val(doc: &mut XmlDocument, parent: NodeId, name: &XName, value: usize) {
    if let Some(node) = doc.find_child(parent, name) {
        doc.set_attribute(node, &XName::local("val"), &value.to_string());
    }
}

/// Finds `name` under `parent`, creating it right after the last of `after` that exists.
fn ensure_child_after(doc: &mut XmlDocument, parent: NodeId, name: &XName, after: &[XName]) -> NodeId {
    if let Some(existing) = doc.find_child(parent, name) {
        return existing;
    }
    let anchor = after.iter().rev().find_map(|n| doc.find_child(parent, n));
    match anchor {
        Some(anchor) => doc.add_after(anchor, XmlNodeData::element(name.clone())),
        None => doc.add_child(parent, XmlNodeData::element(name.clone())),
    }
}

fn clear_children(doc: &mut XmlDocument, node: NodeId) {
    let children: Vec<NodeId> = doc.children(node).collect();
    for child in children {
        doc.remove(child);
    }
}

fn add_text_child(doc: &mut XmlDocument, parent: NodeId, name: XName, text: &str) -> NodeId {
    let node = doc.add_child(parent, XmlNodeData::element(name));
    doc.add_child(node, XmlNodeData::text(text));
    node
}

fn write_points<'a>(doc: &mut XmlDocument, cache: NodeId, values: impl ExactSizeIterator<Item = &'a str>) {
    doc.add_child(
        cache,
        XmlNodeData::element_with_attrs(C::ptCount(), val_attr(values.len())),
    );
    for (i, value) in values.enumerate() {
        let pt = doc.add_child(
            cache,
            XmlNodeData::element_with_attrs(
                C::pt(),
                vec![XAttribute::new(XName::local("idx"), &i.to_string())],
            ),
        );
        add_text_child(doc, pt, C::v(), value);
    }
}

fn write_str_ref(doc: &mut XmlDocument, container: NodeId, formula: &str, labels: &[&str]) {
    clear_children(doc, container);
    let str_ref = doc.add_child(container, XmlNodeData::element(C::strRef()));
    add_text_child(doc, str_ref, C::f(), formula);
    let cache = doc.add_child(str_ref, XmlNodeData::element(C::strCache()));
    write_points(doc, cache, labels.iter().copied());
}

fn write_num_ref(doc: &mut XmlDocument, container: NodeId, formula: &str, values: &[String]) {
    let format_code = doc
        .find_descendant(container, &C::formatCode())
        .map(|n| doc.text(n))
        .unwrap_or_else(|| "General".to_string());
    clear_children(doc, container);
    let num_ref = doc.add_child(container, XmlNodeData::element(C::numRef()));
    add_text_child(doc, num_ref, C::f(), formula);
    let cache = doc.add_child(num_ref, XmlNodeData::element(C::numCache()));
    add_text_child(doc, cache, C::formatCode(), &format_code);
    write_points(doc, cache, values.iter().map(String::as_str));
}

/// Drops the `c16:uniqueId` a cloned series inherited, along with the
/// extension wrappers left empty by it.
fn strip_unique_ids(doc: &mut XmlDocument, ser: NodeId) {
    for unique_id in doc.descendants_named(ser, &C16::uniqueId()) {
        let ext = doc.parent(unique_id).filter(|&p| doc.is(p, &C::ext()));
        doc.remove(unique_id);
        let Some(ext) = ext.filter(|&e| doc.element_children(e).next().is_none()) else {
            continue;
        };
        let ext_lst = doc.parent(ext).filter(|&p| doc.is(p, &C::extLst()));
        doc.remove(ext);
        if let Some(ext_lst) = ext_lst.filter(|&l| doc.element_children(l).next().is_none()) {
            doc.remove(ext_lst);
        }
    }
}

/// Rewrites every series of the chart from `data`, cloning or dropping `c:ser`
/// elements so there is exactly one per data series.
pub fn write_chart_cache(doc: &mut XmlDocument, data: &ChartData, sheet: &str) -> Result<()> {
    let root = doc
        .root()
        .ok_or_else(|| DeckMergeError::malformed("chart part is empty"))?;
    let plot_area = doc
        .find_descendant(root, &C::plotArea())
        .ok_or_else(|| DeckMergeError::ChartData {
            message: "chart has no plot area".to_string(),
        })?;
    let mut series_nodes = doc.descendants_named(plot_area, &C::ser());
    let Some(&template) = series_nodes.first() else {
        return Err(DeckMergeError::ChartData {
            message: "chart has no series to fill".to_string(),
        });
    };

    let mut last = *series_nodes.last().unwrap_or(&template);
    while series_nodes.len() < data.series.len() {
        last = doc
            .duplicate_after(last)
            .ok_or_else(|| DeckMergeError::malformed("could not clone chart series"))?;
        strip_unique_ids(doc, last);
        series_nodes.push(last);
    }
    while series_nodes.len() > data.series.len() {
        if let Some(extra) = series_nodes.pop() {
            doc.remove(extra);
        }
    }

    let rows = data.categories.len();
    let labels: Vec<&str> = data.categories.iter().map(|c| c.label.as_str()).collect();
    for (s, (ser, series)) in series_nodes.iter().zip(&data.series).enumerate() {
        let ser = *ser;
        set_val(doc, ser, &C::idx(), s);
        set_val(doc, ser, &C::order(), s);

        let tx = ensure_child_after(doc, ser, &C::tx(), &[C::idx(), C::order()]);
        write_str_ref(
            doc,
            tx,
            &range_formula(sheet, (0, s + 1), (0, s + 1)),
            &[series.label.as_str()],
        );

        let scatter = doc.find_child(ser, &C::xVal()).is_some() || doc.find_child(ser, &C::yVal()).is_some();
        let (cat_name, val_name) = if scatter {
            (C::xVal(), C::yVal())
        } else {
            (C::cat(), C::val())
        };
        let cat = match doc.find_child(ser, &cat_name) {
            Some(cat) => cat,
            None => match doc.find_child(ser, &val_name) {
                Some(val) => doc.add_before(val, XmlNodeData::element(cat_name.clone())),
                None => ensure_child_after(doc, ser, &cat_name, &[C::idx(), C::order(), C::tx()]),
            },
        };
        let val = ensure_child_after(doc, ser, &val_name, &[cat_name.clone()]);

        let last_row = rows.max(1);
        write_str_ref(doc, cat, &range_formula(sheet, (1, 0), (last_row, 0)), &labels);
        let values: Vec<String> = data
            .categories
            .iter()
            .map(|c| c.values.get(s).copied().map(format_number).unwrap_or_default())
            .collect();
        write_num_ref(
            doc,
            val,
            &range_formula(sheet, (1, s + 1), (last_row, s + 1)),
            &values,
        );
    }
    Ok(())
}

/// Points of a `c:strCache`/`c:numCache` under `container`, by index.
fn cached_points(doc: &XmlDocument, container: NodeId) -> Vec<(usize, String)> {
    doc.descendants(container)
        .filter(|&n| doc.is(n, &C::pt()))
        .filter_map(|pt| {
            let idx = doc.local_attribute(pt, "idx")?.parse().ok()?;
            let value = doc.find_child(pt, &C::v()).map(|v| doc.text(v))?;
            Some((idx, value))
        })
        .collect()
}

fn point_count(doc: &XmlDocument, container: NodeId) -> Option<usize> {
    let count = doc.find_descendant(container, &C::ptCount())?;
    doc.local_attribute(count, "val")?.parse().ok()
}

/// Reads the cached grid back out of a chart.
pub fn read_chart_cache(doc: &XmlDocument) -> ChartData {
    let Some(plot_area) = doc.root().and_then(|r| doc.find_descendant(r, &C::plotArea())) else {
        return ChartData::default();
    };
    let series_nodes = doc.descendants_named(plot_area, &C::ser());
    let mut data = ChartData::default();

    let category_node = series_nodes.first().and_then(|&ser| {
        doc.find_child(ser, &C::cat())
            .or_else(|| doc.find_child(ser, &C::xVal()))
    });
    if let Some(cat) = category_node {
        let points = cached_points(doc, cat);
        let count = point_count(doc, cat)
            .unwrap_or_else(|| points.iter().map(|(i, _)| i + 1).max().unwrap_or(0));
        data.categories = (0..count)
            .map(|_| ChartCategory {
                label: String::new(),
                values: vec![0.0; series_nodes.len()],
            })
            .collect();
        for (idx, label) in points {
            if let Some(category) = data.categories.get_mut(idx) {
                category.label = label;
            }
        }
    }

    for (s, &ser) in series_nodes.iter().enumerate() {
        let label = doc
            .find_child(ser, &C::tx())
            .map(|tx| {
                cached_points(doc, tx)
                    .into_iter()
                    .next()
                    .map(|(_, v)| v)
                    .unwrap_or_else(|| doc.text(tx))
            })
            .unwrap_or_default();
        data.series.push(ChartSeries { label });

        let values = doc
            .find_child(ser, &C::val())
            .or_else(|| doc.find_child(ser, &C::yVal()));
        if let Some(val) = values {
            for (idx, value) in cached_points(doc, val) {
                let parsed = value.trim().parse::<f64>().unwrap_or(0.0);
                if let Some(slot) = data.categories.get_mut(idx).and_then(|c| c.values.get_mut(s)) {
                    *slot = parsed;
                }
            }
        }
    }
    data
}

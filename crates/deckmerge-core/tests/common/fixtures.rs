//! Minimal presentation packages built in memory with the `zip` crate.
//!
//! Only std and `zip` are used here so the same file serves the unit tests
//! (included into the library) and the integration tests.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS_DECLS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);
const C_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
const S_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
const CT_SML: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml";

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Layout names of the fixture master, in `sldLayoutIdLst` order.
/// Target of the `with_external_link` hyperlink.
pub const EXTERNAL_URL: &str = "https://example.com/";

pub const LAYOUTS: [&str; 2] = ["Title and Content", "Title Only"];

fn rel_type(suffix: &str) -> String {
    format!("{REL_BASE}/{suffix}")
}

fn rels_xml(rels: &[(String, String, String)]) -> String {
    let mut xml = format!(
        r#"{XML_HEADER}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for (id, rel_type, target) in rels {
        let mode = if target.starts_with("https://") {
            r#" TargetMode="External""#
        } else {
            ""
        };
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"{mode}/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn rel(id: &str, suffix: &str, target: &str) -> (String, String, String) {
    (id.to_string(), rel_type(suffix), target.to_string())
}

fn content_types_xml(defaults: &[(&str, &str)], overrides: &[(String, String)]) -> String {
    let mut xml = format!(
        r#"{XML_HEADER}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#
    );
    for (ext, ct) in defaults {
        xml.push_str(&format!(r#"<Default Extension="{ext}" ContentType="{ct}"/>"#));
    }
    for (path, ct) in overrides {
        xml.push_str(&format!(r#"<Override PartName="/{path}" ContentType="{ct}"/>"#));
    }
    xml.push_str("</Types>");
    xml
}

fn zip_entries(entries: &BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(name.as_str(), options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

fn group_header() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn placeholder_shape(id: usize, kind: &str, index: Option<u32>, text: Option<&str>) -> String {
    let idx = index.map(|i| format!(r#" idx="{i}""#)).unwrap_or_default();
    let paragraph = match text {
        Some(text) => format!(r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>{text}</a:t></a:r></a:p>"#),
        None => r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string(),
    };
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="{kind}"{idx}/></p:nvPr></p:nvSpPr><p:spPr/>"#,
            r#"<p:txBody><a:bodyPr/><a:lstStyle/>{paragraph}</p:txBody></p:sp>"#
        ),
        id = id,
        name = format!("{} {}", capitalized(kind), id - 1),
        kind = kind,
        idx = idx,
        paragraph = paragraph,
    )
}

/// A slide layout named `name` holding one placeholder per `(type, idx)`.
pub fn layout_xml(name: &str, placeholders: &[(&str, Option<u32>)]) -> String {
    let shapes: String = placeholders
        .iter()
        .enumerate()
        .map(|(i, (kind, index))| placeholder_shape(i + 2, kind, *index, None))
        .collect();
    format!(
        concat!(
            "{header}<p:sldLayout {ns} preserve=\"1\"><p:cSld name=\"{name}\"><p:spTree>{group}{shapes}",
            "</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
        ),
        header = XML_HEADER,
        ns = NS_DECLS,
        name = name,
        group = group_header(),
        shapes = shapes,
    )
}

fn master_xml(name: &str) -> String {
    format!(
        concat!(
            "{header}<p:sldMaster {ns}><p:cSld name=\"{name}\"><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>",
            "<p:spTree>{group}{title}</p:spTree></p:cSld>",
            "<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" ",
            "accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>",
            "<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/><p:sldLayoutId id=\"2147483650\" r:id=\"rId2\"/></p:sldLayoutIdLst>",
            "<p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"
        ),
        header = XML_HEADER,
        ns = NS_DECLS,
        name = name,
        group = group_header(),
        title = placeholder_shape(2, "title", None, None),
    )
}

fn theme_xml(name: &str) -> String {
    format!(
        concat!(
            "{header}<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"{name}\">",
            "<a:themeElements><a:clrScheme name=\"Office\">",
            "<a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1><a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>",
            "<a:dk2><a:srgbClr val=\"44546A\"/></a:dk2><a:lt2><a:srgbClr val=\"E7E6E6\"/></a:lt2>",
            "<a:accent1><a:srgbClr val=\"4472C4\"/></a:accent1><a:accent2><a:srgbClr val=\"ED7D31\"/></a:accent2>",
            "<a:accent3><a:srgbClr val=\"A5A5A5\"/></a:accent3><a:accent4><a:srgbClr val=\"FFC000\"/></a:accent4>",
            "<a:accent5><a:srgbClr val=\"5B9BD5\"/></a:accent5><a:accent6><a:srgbClr val=\"70AD47\"/></a:accent6>",
            "<a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink><a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink></a:clrScheme>",
            "<a:fontScheme name=\"Office\"><a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>",
            "<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont></a:fontScheme>",
            "<a:fmtScheme name=\"Office\"><a:fillStyleLst/><a:lnStyleLst/><a:effectStyleLst/><a:bgFillStyleLst/></a:fmtScheme>",
            "</a:themeElements></a:theme>"
        ),
        header = XML_HEADER,
        name = name,
    )
}

fn column(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// A clustered bar chart with `series` series over `categories` categories,
/// its formulas pointing at `Sheet1` of the embedded workbook (`rId1`).
pub fn chart_xml(series: usize, categories: usize) -> String {
    let last_row = categories + 1;
    let mut sers = String::new();
    for s in 0..series {
        let col = column(s + 1);
        let cat_points: String = (0..categories)
            .map(|c| format!(r#"<c:pt idx="{c}"><c:v>Category {}</c:v></c:pt>"#, c + 1))
            .collect();
        let val_points: String = (0..categories)
            .map(|c| format!(r#"<c:pt idx="{c}"><c:v>{}</c:v></c:pt>"#, (s + 1) * (c + 1)))
            .collect();
        sers.push_str(&format!(
            concat!(
                r#"<c:ser><c:idx val="{s}"/><c:order val="{s}"/>"#,
                r#"<c:tx><c:strRef><c:f>Sheet1!${col}$1</c:f><c:strCache><c:ptCount val="1"/><c:pt idx="0"><c:v>Series {n}</c:v></c:pt></c:strCache></c:strRef></c:tx>"#,
                r#"<c:invertIfNegative val="0"/>"#,
                r#"<c:cat><c:strRef><c:f>Sheet1!$A$2:$A${last}</c:f><c:strCache><c:ptCount val="{count}"/>{cats}</c:strCache></c:strRef></c:cat>"#,
                r#"<c:val><c:numRef><c:f>Sheet1!${col}$2:${col}${last}</c:f><c:numCache><c:formatCode>General</c:formatCode><c:ptCount val="{count}"/>{vals}</c:numCache></c:numRef></c:val>"#,
                r#"</c:ser>"#
            ),
            s = s,
            n = s + 1,
            col = col,
            last = last_row,
            count = categories,
            cats = cat_points,
            vals = val_points,
        ));
    }
    format!(
        concat!(
            "{header}<c:chartSpace xmlns:c=\"{c}\" xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" xmlns:r=\"{r}\">",
            "<c:date1904 val=\"0\"/><c:chart><c:autoTitleDeleted val=\"0\"/><c:plotArea><c:layout/>",
            "<c:barChart><c:barDir val=\"col\"/><c:grouping val=\"clustered\"/><c:varyColors val=\"0\"/>{sers}",
            "<c:axId val=\"1\"/><c:axId val=\"2\"/></c:barChart>",
            "<c:catAx><c:axId val=\"1\"/><c:crossAx val=\"2\"/></c:catAx><c:valAx><c:axId val=\"2\"/><c:crossAx val=\"1\"/></c:valAx>",
            "</c:plotArea><c:plotVisOnly val=\"1\"/></c:chart>",
            "<c:externalData r:id=\"rId1\"><c:autoUpdate val=\"0\"/></c:externalData></c:chartSpace>"
        ),
        header = XML_HEADER,
        c = C_NS,
        r = R_NS,
        sers = sers,
    )
}

/// An `.xlsx` holding the 2x2 grid behind [`chart_xml`]`(2, 2)` on `Sheet1`.
///
/// With `with_table` the grid is a table (first column "Category") and its
/// labels live in a shared-string table; without it labels are inline.
pub fn workbook_bytes(with_table: bool) -> Vec<u8> {
    let mut entries: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut overrides = vec![
        ("xl/workbook.xml".to_string(), format!("{CT_SML}.sheet.main+xml")),
        ("xl/worksheets/sheet1.xml".to_string(), format!("{CT_SML}.worksheet+xml")),
    ];
    let mut workbook_rels = vec![rel("rId1", "worksheet", "worksheets/sheet1.xml")];

    let labels = ["Category", "Series 1", "Series 2", "Category 1", "Category 2"];
    let label_cell = |reference: &str, index: usize| {
        if with_table {
            format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#)
        } else {
            format!(r#"<c r="{reference}" t="str"><v>{}</v></c>"#, labels[index])
        }
    };
    let rows = format!(
        concat!(
            r#"<row r="1" spans="1:3">{a1}{b1}{c1}</row>"#,
            r#"<row r="2" spans="1:3">{a2}<c r="B2"><v>1</v></c><c r="C2"><v>2</v></c></row>"#,
            r#"<row r="3" spans="1:3">{a3}<c r="B3"><v>2</v></c><c r="C3"><v>4</v></c></row>"#
        ),
        a1 = label_cell("A1", 0),
        b1 = label_cell("B1", 1),
        c1 = label_cell("C1", 2),
        a2 = label_cell("A2", 3),
        a3 = label_cell("A3", 4),
    );
    let table_parts = if with_table {
        r#"<tableParts count="1"><tablePart r:id="rId1"/></tableParts>"#
    } else {
        ""
    };
    entries.insert(
        "xl/worksheets/sheet1.xml".to_string(),
        format!(
            r#"{XML_HEADER}<worksheet xmlns="{S_NS}" xmlns:r="{R_NS}"><dimension ref="A1:C3"/><sheetData>{rows}</sheetData>{table_parts}</worksheet>"#
        )
        .into_bytes(),
    );

    if with_table {
        let strings: String = labels
            .iter()
            .map(|l| format!("<si><t>{l}</t></si>"))
            .collect();
        entries.insert(
            "xl/sharedStrings.xml".to_string(),
            format!(
                r#"{XML_HEADER}<sst xmlns="{S_NS}" count="5" uniqueCount="5">{strings}</sst>"#
            )
            .into_bytes(),
        );
        overrides.push((
            "xl/sharedStrings.xml".to_string(),
            format!("{CT_SML}.sharedStrings+xml"),
        ));
        workbook_rels.push(rel("rId2", "sharedStrings", "sharedStrings.xml"));

        entries.insert(
            "xl/tables/table1.xml".to_string(),
            format!(
                concat!(
                    r#"{header}<table xmlns="{s}" id="1" name="Table1" displayName="Table1" ref="A1:C3" totalsRowShown="0">"#,
                    r#"<autoFilter ref="A1:C3"/><tableColumns count="3"><tableColumn id="1" name="Category"/>"#,
                    r#"<tableColumn id="2" name="Series 1"/><tableColumn id="3" name="Series 2"/></tableColumns>"#,
                    r#"<tableStyleInfo name="TableStyleMedium2" showFirstColumn="0" showLastColumn="0" showRowStripes="1" showColumnStripes="0"/></table>"#
                ),
                header = XML_HEADER,
                s = S_NS,
            )
            .into_bytes(),
        );
        overrides.push(("xl/tables/table1.xml".to_string(), format!("{CT_SML}.table+xml")));
        entries.insert(
            "xl/worksheets/_rels/sheet1.xml.rels".to_string(),
            rels_xml(&[rel("rId1", "table", "../tables/table1.xml")]).into_bytes(),
        );
    }

    entries.insert(
        "xl/workbook.xml".to_string(),
        format!(
            r#"{XML_HEADER}<workbook xmlns="{S_NS}" xmlns:r="{R_NS}"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        )
        .into_bytes(),
    );
    entries.insert(
        "xl/_rels/workbook.xml.rels".to_string(),
        rels_xml(&workbook_rels).into_bytes(),
    );
    entries.insert(
        "_rels/.rels".to_string(),
        rels_xml(&[rel("rId1", "officeDocument", "xl/workbook.xml")]).into_bytes(),
    );
    entries.insert(
        "[Content_Types].xml".to_string(),
        content_types_xml(
            &[
                ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
                ("xml", "application/xml"),
            ],
            &overrides,
        )
        .into_bytes(),
    );
    zip_entries(&entries)
}

fn png_bytes(seed: u8) -> Vec<u8> {
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.extend(std::iter::repeat(seed).take(24));
    png
}

/// Builds a small but complete presentation package.
///
/// `deck(n)` has `n` slides on layout 1 ("Title and Content") of one master
/// with two layouts and one theme. Slide 1 shows `ppt/media/image1.png`.
/// Every slide has a title placeholder named `Title 1` reading "Slide N".
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    slides: usize,
    master_name: String,
    notes: bool,
    slide_jump: bool,
    external_link: bool,
    custom_data: bool,
    chart: bool,
    core_properties: bool,
    picture_on_all: bool,
    image_seed: u8,
    without: Vec<String>,
    without_default: Vec<String>,
}

impl PackageBuilder {
    pub fn deck(slides: usize) -> Self {
        Self {
            slides,
            master_name: "Office Theme".to_string(),
            notes: false,
            slide_jump: false,
            external_link: false,
            custom_data: false,
            chart: false,
            core_properties: false,
            picture_on_all: false,
            image_seed: 1,
            without: Vec::new(),
            without_default: Vec::new(),
        }
    }

    pub fn master_name(mut self, name: &str) -> Self {
        self.master_name = name.to_string();
        self
    }

    /// A notes master plus one notes slide per slide.
    pub fn with_notes(mut self) -> Self {
        self.notes = true;
        self
    }

    /// Slide 1 links to slide 2 through a slide relationship.
    pub fn with_slide_jump(mut self) -> Self {
        self.slide_jump = true;
        self
    }

    /// Slide 1 gets a shape `Link` whose click opens `EXTERNAL_URL`.
    pub fn with_external_link(mut self) -> Self {
        self.external_link = true;
        self
    }

    /// Slide 1 references `ppt/custom/data.bin`, declared by a `bin` default.
    pub fn with_custom_data(mut self) -> Self {
        self.custom_data = true;
        self
    }

    /// A chart frame named `Chart 3` on slide 1 with an embedded workbook.
    pub fn with_chart(mut self) -> Self {
        self.chart = true;
        self
    }

    pub fn with_core_properties(mut self) -> Self {
        self.core_properties = true;
        self
    }

    /// Every slide shows the picture, not just slide 1.
    pub fn picture_on_all(mut self) -> Self {
        self.picture_on_all = true;
        self
    }

    /// Varies the image bytes so the image differs from other decks'.
    pub fn image_seed(mut self, seed: u8) -> Self {
        self.image_seed = seed;
        self
    }

    /// Leaves an archive entry out of the built package.
    pub fn without(mut self, entry: &str) -> Self {
        self.without.push(entry.to_string());
        self
    }

    /// Leaves a `Default` content-type declaration out.
    pub fn without_default(mut self, extension: &str) -> Self {
        self.without_default.push(extension.to_string());
        self
    }

    fn has_picture(&self, slide: usize) -> bool {
        slide == 1 || self.picture_on_all
    }

    fn slide_xml(&self, n: usize) -> String {
        let mut shapes = placeholder_shape(2, "title", None, Some(&format!("Slide {n}")));
        if self.has_picture(n) {
            shapes.push_str(concat!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture 2"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
                r#"<p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
                r#"<p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
            ));
        }
        if self.chart && n == 1 {
            shapes.push_str(&format!(
                concat!(
                    r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Chart 3"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>"#,
                    r#"<p:xfrm><a:off x="0" y="0"/><a:ext cx="4572000" cy="2743200"/></p:xfrm>"#,
                    r#"<a:graphic><a:graphicData uri="{c}"><c:chart xmlns:c="{c}" r:id="rId3"/></a:graphicData></a:graphic></p:graphicFrame>"#
                ),
                c = C_NS,
            ));
        }
        if self.slide_jump && n == 1 && self.slides > 1 {
            shapes.push_str(concat!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="5" name="Next"><a:hlinkClick r:id="rId5" action="ppaction://hlinksldjump"/></p:cNvPr>"#,
                r#"<p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>"#,
                r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>Next</a:t></a:r></a:p></p:txBody></p:sp>"#
            ));
        }
        if self.external_link && n == 1 {
            shapes.push_str(concat!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="6" name="Link"><a:hlinkClick r:id="rId6"/></p:cNvPr>"#,
                r#"<p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>"#,
                r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>Website</a:t></a:r></a:p></p:txBody></p:sp>"#
            ));
        }
        format!(
            concat!(
                "{header}<p:sld {ns}><p:cSld><p:spTree>{group}{shapes}</p:spTree></p:cSld>",
                "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
            ),
            header = XML_HEADER,
            ns = NS_DECLS,
            group = group_header(),
            shapes = shapes,
        )
    }

    fn notes_xml(n: usize) -> String {
        format!(
            concat!(
                "{header}<p:notes {ns}><p:cSld><p:spTree>{group}{body}</p:spTree></p:cSld>",
                "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>"
            ),
            header = XML_HEADER,
            ns = NS_DECLS,
            group = group_header(),
            body = placeholder_shape(2, "body", Some(1), Some(&format!("Notes for slide {n}"))),
        )
    }

    fn notes_master_xml() -> String {
        format!(
            concat!(
                "{header}<p:notesMaster {ns}><p:cSld><p:spTree>{group}{body}</p:spTree></p:cSld>",
                "<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" ",
                "accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>",
                "</p:notesMaster>"
            ),
            header = XML_HEADER,
            ns = NS_DECLS,
            group = group_header(),
            body = placeholder_shape(2, "body", Some(1), None),
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut entries: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut overrides: Vec<(String, String)> = Vec::new();
        let mut put = |entries: &mut BTreeMap<String, Vec<u8>>, path: &str, ct: Option<String>, body: Vec<u8>| {
            if let Some(ct) = ct {
                overrides.push((path.to_string(), ct));
            }
            entries.insert(path.to_string(), body);
        };

        // package root
        let mut root_rels = vec![rel("rId1", "officeDocument", "ppt/presentation.xml")];
        if self.core_properties {
            root_rels.push((
                "rId2".to_string(),
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties"
                    .to_string(),
                "docProps/core.xml".to_string(),
            ));
            put(
                &mut entries,
                "docProps/core.xml",
                Some("application/vnd.openxmlformats-package.core-properties+xml".to_string()),
                format!(
                    concat!(
                        "{}<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" ",
                        "xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" ",
                        "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
                        "<dc:title>Fixture deck</dc:title><dc:creator>fixtures</dc:creator>",
                        "<dcterms:created xsi:type=\"dcterms:W3CDTF\">2024-01-01T00:00:00Z</dcterms:created>",
                        "<dcterms:modified xsi:type=\"dcterms:W3CDTF\">2024-01-01T00:00:00Z</dcterms:modified>",
                        "</cp:coreProperties>"
                    ),
                    XML_HEADER
                )
                .into_bytes(),
            );
        }
        put(&mut entries, "_rels/.rels", None, rels_xml(&root_rels).into_bytes());

        // presentation
        let mut pres_rels = vec![
            rel("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            rel("rId2", "theme", "theme/theme1.xml"),
        ];
        let mut slide_ids = String::new();
        for n in 1..=self.slides {
            let id = format!("rId{}", n + 2);
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{id}"/>"#, 255 + n));
            pres_rels.push(rel(&id, "slide", &format!("slides/slide{n}.xml")));
        }
        let notes_master_list = if self.notes {
            let id = format!("rId{}", self.slides + 3);
            pres_rels.push(rel(&id, "notesMaster", "notesMasters/notesMaster1.xml"));
            format!(r#"<p:notesMasterIdLst><p:notesMasterId r:id="{id}"/></p:notesMasterIdLst>"#)
        } else {
            String::new()
        };
        let slide_list = if self.slides > 0 {
            format!("<p:sldIdLst>{slide_ids}</p:sldIdLst>")
        } else {
            String::new()
        };
        put(
            &mut entries,
            "ppt/presentation.xml",
            Some(format!("{CT_PML}.presentation.main+xml")),
            format!(
                concat!(
                    "{header}<p:presentation {ns} saveSubsetFonts=\"1\">",
                    "<p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>",
                    "{notes}{slides}<p:sldSz cx=\"12192000\" cy=\"6858000\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/>",
                    "</p:presentation>"
                ),
                header = XML_HEADER,
                ns = NS_DECLS,
                notes = notes_master_list,
                slides = slide_list,
            )
            .into_bytes(),
        );
        put(
            &mut entries,
            "ppt/_rels/presentation.xml.rels",
            None,
            rels_xml(&pres_rels).into_bytes(),
        );

        // master, layouts, theme
        put(
            &mut entries,
            "ppt/slideMasters/slideMaster1.xml",
            Some(format!("{CT_PML}.slideMaster+xml")),
            master_xml(&self.master_name).into_bytes(),
        );
        put(
            &mut entries,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            None,
            rels_xml(&[
                rel("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                rel("rId2", "slideLayout", "../slideLayouts/slideLayout2.xml"),
                rel("rId3", "theme", "../theme/theme1.xml"),
            ])
            .into_bytes(),
        );
        let layout_placeholders: [&[(&str, Option<u32>)]; 2] =
            [&[("title", None), ("body", Some(1))], &[("title", None)]];
        for (i, (name, placeholders)) in LAYOUTS.iter().zip(layout_placeholders).enumerate() {
            let n = i + 1;
            put(
                &mut entries,
                &format!("ppt/slideLayouts/slideLayout{n}.xml"),
                Some(format!("{CT_PML}.slideLayout+xml")),
                layout_xml(name, placeholders).into_bytes(),
            );
            put(
                &mut entries,
                &format!("ppt/slideLayouts/_rels/slideLayout{n}.xml.rels"),
                None,
                rels_xml(&[rel("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).into_bytes(),
            );
        }
        put(
            &mut entries,
            "ppt/theme/theme1.xml",
            Some("application/vnd.openxmlformats-officedocument.theme+xml".to_string()),
            theme_xml("Office Theme").into_bytes(),
        );

        // slides
        for n in 1..=self.slides {
            let mut rels = vec![rel("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")];
            if self.has_picture(n) {
                rels.push(rel("rId2", "image", "../media/image1.png"));
            }
            if self.chart && n == 1 {
                rels.push(rel("rId3", "chart", "../charts/chart1.xml"));
            }
            if self.notes {
                rels.push(rel("rId4", "notesSlide", &format!("../notesSlides/notesSlide{n}.xml")));
            }
            if self.slide_jump && n == 1 && self.slides > 1 {
                rels.push(rel("rId5", "slide", "slide2.xml"));
            }
            if self.external_link && n == 1 {
                rels.push(rel("rId6", "hyperlink", EXTERNAL_URL));
            }
            if self.custom_data && n == 1 {
                rels.push(rel("rId7", "customData", "../custom/data.bin"));
            }
            put(
                &mut entries,
                &format!("ppt/slides/slide{n}.xml"),
                Some(format!("{CT_PML}.slide+xml")),
                self.slide_xml(n).into_bytes(),
            );
            put(
                &mut entries,
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                None,
                rels_xml(&rels).into_bytes(),
            );

            if self.notes {
                put(
                    &mut entries,
                    &format!("ppt/notesSlides/notesSlide{n}.xml"),
                    Some(format!("{CT_PML}.notesSlide+xml")),
                    Self::notes_xml(n).into_bytes(),
                );
                put(
                    &mut entries,
                    &format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                    None,
                    rels_xml(&[
                        rel("rId1", "notesMaster", "../notesMasters/notesMaster1.xml"),
                        rel("rId2", "slide", &format!("../slides/slide{n}.xml")),
                    ])
                    .into_bytes(),
                );
            }
        }

        if self.slides > 0 && (1..=self.slides).any(|n| self.has_picture(n)) {
            put(&mut entries, "ppt/media/image1.png", None, png_bytes(self.image_seed));
        }

        if self.custom_data && self.slides > 0 {
            put(&mut entries, "ppt/custom/data.bin", None, vec![0xDA, 0x7A, 0x00, 0x01]);
        }

        if self.notes {
            put(
                &mut entries,
                "ppt/notesMasters/notesMaster1.xml",
                Some(format!("{CT_PML}.notesMaster+xml")),
                Self::notes_master_xml().into_bytes(),
            );
            put(
                &mut entries,
                "ppt/notesMasters/_rels/notesMaster1.xml.rels",
                None,
                rels_xml(&[rel("rId1", "theme", "../theme/theme2.xml")]).into_bytes(),
            );
            put(
                &mut entries,
                "ppt/theme/theme2.xml",
                Some("application/vnd.openxmlformats-officedocument.theme+xml".to_string()),
                theme_xml("Notes Theme").into_bytes(),
            );
        }

        if self.chart && self.slides > 0 {
            put(
                &mut entries,
                "ppt/charts/chart1.xml",
                Some("application/vnd.openxmlformats-officedocument.drawingml.chart+xml".to_string()),
                chart_xml(2, 2).into_bytes(),
            );
            put(
                &mut entries,
                "ppt/charts/_rels/chart1.xml.rels",
                None,
                rels_xml(&[rel("rId1", "package", "../embeddings/Microsoft_Excel_Worksheet1.xlsx")])
                    .into_bytes(),
            );
            put(
                &mut entries,
                "ppt/embeddings/Microsoft_Excel_Worksheet1.xlsx",
                None,
                workbook_bytes(true),
            );
        }

        let defaults: Vec<(&str, &str)> = [
            ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
            ("xml", "application/xml"),
            ("png", "image/png"),
            ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            ("bin", "application/octet-stream"),
        ]
        .into_iter()
        .filter(|(ext, _)| !self.without_default.iter().any(|w| w == ext))
        .collect();
        entries.insert(
            "[Content_Types].xml".to_string(),
            content_types_xml(&defaults, &overrides).into_bytes(),
        );

        for entry in &self.without {
            entries.remove(entry);
        }
        zip_entries(&entries)
    }
}

#![allow(non_snake_case)]

use super::xname::XName;

pub mod P {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    pub fn cSld() -> XName { XName::new(NS, "cSld") }
    pub fn spTree() -> XName { XName::new(NS, "spTree") }
    pub fn sp() -> XName { XName::new(NS, "sp") }
    pub fn pic() -> XName { XName::new(NS, "pic") }
    pub fn graphicFrame() -> XName { XName::new(NS, "graphicFrame") }
    pub fn grpSp() -> XName { XName::new(NS, "grpSp") }
    pub fn cxnSp() -> XName { XName::new(NS, "cxnSp") }
    pub fn contentPart() -> XName { XName::new(NS, "contentPart") }
    pub fn cNvPr() -> XName { XName::new(NS, "cNvPr") }
    pub fn ph() -> XName { XName::new(NS, "ph") }
    pub fn spPr() -> XName { XName::new(NS, "spPr") }
    pub fn txBody() -> XName { XName::new(NS, "txBody") }
    pub fn sldIdLst() -> XName { XName::new(NS, "sldIdLst") }
    pub fn sldId() -> XName { XName::new(NS, "sldId") }
    pub fn sldMasterIdLst() -> XName { XName::new(NS, "sldMasterIdLst") }
    pub fn sldMasterId() -> XName { XName::new(NS, "sldMasterId") }
    pub fn notesMasterIdLst() -> XName { XName::new(NS, "notesMasterIdLst") }
    pub fn notesMasterId() -> XName { XName::new(NS, "notesMasterId") }
    pub fn handoutMasterIdLst() -> XName { XName::new(NS, "handoutMasterIdLst") }
    pub fn sldLayoutIdLst() -> XName { XName::new(NS, "sldLayoutIdLst") }
    pub fn sldLayoutId() -> XName { XName::new(NS, "sldLayoutId") }
    pub fn sldSz() -> XName { XName::new(NS, "sldSz") }
    pub fn notesSz() -> XName { XName::new(NS, "notesSz") }
}

pub mod A {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    pub fn blip() -> XName { XName::new(NS, "blip") }
    pub fn hlinkClick() -> XName { XName::new(NS, "hlinkClick") }
    pub fn hlinkHover() -> XName { XName::new(NS, "hlinkHover") }
    pub fn extLst() -> XName { XName::new(NS, "extLst") }
    pub fn ext() -> XName { XName::new(NS, "ext") }
    pub fn bodyPr() -> XName { XName::new(NS, "bodyPr") }
    pub fn lstStyle() -> XName { XName::new(NS, "lstStyle") }
    pub fn noFill() -> XName { XName::new(NS, "noFill") }
    pub fn solidFill() -> XName { XName::new(NS, "solidFill") }
    pub fn gradFill() -> XName { XName::new(NS, "gradFill") }
    pub fn blipFill() -> XName { XName::new(NS, "blipFill") }
    pub fn pattFill() -> XName { XName::new(NS, "pattFill") }
    pub fn grpFill() -> XName { XName::new(NS, "grpFill") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn xfrm() -> XName { XName::new(NS, "xfrm") }
    pub fn prstGeom() -> XName { XName::new(NS, "prstGeom") }
    pub fn custGeom() -> XName { XName::new(NS, "custGeom") }
}

/// Office 2016 drawing extensions, home of `creationId`.
pub mod A16 {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/drawing/2014/main";
    /// `a:ext/@uri` value wrapping an `a16:creationId`.
    pub const CREATION_ID_EXT_URI: &str = "{FF2B5EF4-FFF2-40B4-BE49-F238E27FC236}";

    pub fn creationId() -> XName { XName::new(NS, "creationId") }
}

pub mod C {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";

    pub fn chart() -> XName { XName::new(NS, "chart") }
    pub fn plotArea() -> XName { XName::new(NS, "plotArea") }
    pub fn ser() -> XName { XName::new(NS, "ser") }
    pub fn idx() -> XName { XName::new(NS, "idx") }
    pub fn order() -> XName { XName::new(NS, "order") }
    pub fn tx() -> XName { XName::new(NS, "tx") }
    pub fn cat() -> XName { XName::new(NS, "cat") }
    pub fn val() -> XName { XName::new(NS, "val") }
    pub fn xVal() -> XName { XName::new(NS, "xVal") }
    pub fn yVal() -> XName { XName::new(NS, "yVal") }
    pub fn strRef() -> XName { XName::new(NS, "strRef") }
    pub fn numRef() -> XName { XName::new(NS, "numRef") }
    pub fn strCache() -> XName { XName::new(NS, "strCache") }
    pub fn numCache() -> XName { XName::new(NS, "numCache") }
    pub fn f() -> XName { XName::new(NS, "f") }
    pub fn formatCode() -> XName { XName::new(NS, "formatCode") }
    pub fn ptCount() -> XName { XName::new(NS, "ptCount") }
    pub fn pt() -> XName { XName::new(NS, "pt") }
    pub fn v() -> XName { XName::new(NS, "v") }
    pub fn externalData() -> XName { XName::new(NS, "externalData") }
    pub fn extLst() -> XName { XName::new(NS, "extLst") }
    pub fn ext() -> XName { XName::new(NS, "ext") }
}

/// Office 2016 chart extensions.
pub mod C16 {
    use super::XName;
    pub const NS: &str = "http://schemas.microsoft.com/office/drawing/2014/chart";

    pub fn uniqueId() -> XName { XName::new(NS, "uniqueId") }
}

pub mod S {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    pub fn sheets() -> XName { XName::new(NS, "sheets") }
    pub fn sheet() -> XName { XName::new(NS, "sheet") }
    pub fn dimension() -> XName { XName::new(NS, "dimension") }
    pub fn sheetData() -> XName { XName::new(NS, "sheetData") }
    pub fn row() -> XName { XName::new(NS, "row") }
    pub fn c() -> XName { XName::new(NS, "c") }
    pub fn v() -> XName { XName::new(NS, "v") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn si() -> XName { XName::new(NS, "si") }
    pub fn autoFilter() -> XName { XName::new(NS, "autoFilter") }
    pub fn tableColumns() -> XName { XName::new(NS, "tableColumns") }
    pub fn tableColumn() -> XName { XName::new(NS, "tableColumn") }
}

pub mod R {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    pub fn id() -> XName { XName::new(NS, "id") }
    pub fn embed() -> XName { XName::new(NS, "embed") }
    pub fn link() -> XName { XName::new(NS, "link") }
    pub fn pict() -> XName { XName::new(NS, "pict") }
    pub fn dm() -> XName { XName::new(NS, "dm") }
    pub fn lo() -> XName { XName::new(NS, "lo") }
    pub fn qs() -> XName { XName::new(NS, "qs") }
    pub fn cs() -> XName { XName::new(NS, "cs") }
}

/// Package relationships (`*.rels` parts).
pub mod PR {
    pub const NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
}

/// `[Content_Types].xml`.
pub mod CT {
    pub const NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
}

pub mod DCTERMS {
    use super::XName;
    pub const NS: &str = "http://purl.org/dc/terms/";

    pub fn modified() -> XName { XName::new(NS, "modified") }
}

pub mod XSI {
    use super::XName;
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

    pub fn r#type() -> XName { XName::new(NS, "type") }
}

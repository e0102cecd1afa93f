//! SVG builder — accumulates SVG elements and produces the final string.

pub(super) struct SvgBuilder {
    pub(super) elements: Vec<String>,
    width: f64,
    height: f64,
}

impl SvgBuilder {
    pub(super) fn new(width: f64, height: f64) -> Self {
        Self {
            elements: Vec::new(),
            width,
            height,
        }
    }

    pub(super) fn build(self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {} {}" width="{}" height="{}" style="font-family: 'Helvetica', 'Arial', sans-serif;">"#,
            self.width, self.height, self.width, self.height
        );
        svg.push('\n');
        for el in &self.elements {
            svg.push_str("  ");
            svg.push_str(el);
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Place a raster image at the origin at its native size.
    pub(super) fn image(&mut self, href: &str) {
        self.elements.push(format!(
            r#"<image x="0" y="0" width="{}" height="{}" href="{}" xlink:href="{}"/>"#,
            self.width,
            self.height,
            escape(href),
            escape(href)
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: &str,
        stroke: &str,
        stroke_width: f64,
    ) {
        if stroke_width > 0.0 {
            self.elements.push(format!(
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="{}" stroke-width="{:.1}"/>"#,
                x, y, w, h, fill, stroke, stroke_width
            ));
        } else {
            self.elements.push(format!(
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
                x, y, w, h, fill
            ));
        }
    }

    /// Text on a translucent plate, as used for box captions.
    pub(super) fn caption(&mut self, x: f64, y: f64, content: &str, size: f64, plate: &str) {
        let plate_w = content.chars().count() as f64 * size * 0.6 + 2.0;
        self.elements.push(format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="0.5"/>"#,
            x - 1.0,
            y - size,
            plate_w,
            size + 2.0,
            plate
        ));
        self.elements.push(format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{:.0}" fill="white">{}</text>"#,
            x,
            y,
            size,
            escape(content)
        ));
    }
}

fn escape(content: &str) -> String {
    content
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_closed_document() {
        let mut svg = SvgBuilder::new(100.0, 50.0);
        svg.rect(1.0, 2.0, 3.0, 4.0, "none", "red", 1.0);
        svg.caption(1.0, 2.0, "<C4>", 8.0, "red");
        let out = svg.build();
        assert!(out.starts_with("<svg"));
        assert!(out.ends_with("</svg>\n"));
        assert!(out.contains(r#"viewBox="0 0 100 50""#));
        assert!(out.contains("&lt;C4&gt;"));
        assert!(out.contains(r#"stroke="red""#));
    }
}

//! Font harvesting from a recorded session.
//!
//! Firmware built for font capture prints `Font:<codepoint>,<x>,<y>,<w>,<h>`
//! markers; each marker snapshots the named box out of the most recently
//! reported screen. All glyphs must share one cell shape.

use std::collections::BTreeMap;

use signal::{EventKind, Font, OutputKind, ScreenBuffer, Value};
use wire::{EventData, Request};

use crate::error::FontError;
use crate::log_store::RequestLog;

/// Scans a log for font markers. Returns `None` when the log contains no
/// valid glyph captures.
pub fn build_font(log: &RequestLog) -> Result<Option<Font>, FontError> {
    let mut last_screen: Option<&ScreenBuffer> = None;
    let mut glyphs: BTreeMap<u32, ScreenBuffer> = BTreeMap::new();
    let mut shape: Option<(u16, u16)> = None;

    for request in log.requests() {
        match request {
            Request::Output(output) if output.kind == OutputKind::Screen => {
                if let Some(Value::Screen(screen)) = output.values.first() {
                    last_screen = Some(screen);
                }
            }
            Request::Event(event) if event.kind == EventKind::Print => {
                let Some(EventData::Text(text)) = &event.data else {
                    continue;
                };
                let Some((codepoint, x, y, w, h)) = parse_marker(text) else {
                    continue;
                };
                let Some(screen) = last_screen else {
                    continue;
                };
                match shape {
                    None => shape = Some((w, h)),
                    Some((sw, sh)) if (sw, sh) != (w, h) => {
                        return Err(FontError::MixedShapes(sw, sh, w, h));
                    }
                    Some(_) => {}
                }
                glyphs.insert(codepoint, screen.region(x, y, w, h));
            }
            _ => {}
        }
    }

    Ok(shape.map(|(width, height)| Font {
        width,
        height,
        glyphs,
    }))
}

/// Parses `Font:<codepoint>,<x>,<y>,<w>,<h>`.
fn parse_marker(text: &str) -> Option<(u32, u16, u16, u16, u16)> {
    let rest = text.strip_prefix("Font:")?;
    let mut parts = rest.split(',');
    let codepoint = parts.next()?.trim().parse().ok()?;
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    let w = parts.next()?.trim().parse().ok()?;
    let h = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((codepoint, x, y, w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph_screen() -> ScreenBuffer {
        let mut screen = ScreenBuffer::new(16, 8);
        screen.set(0, 0, true);
        screen.set(1, 1, true);
        screen.set(5, 2, true);
        screen
    }

    #[test]
    fn harvests_glyphs_from_markers() {
        let mut log = RequestLog::new();
        log.append(Request::screen(100, glyph_screen()));
        log.append(Request::print(110, "Font:65,0,0,4,6"));
        log.append(Request::print(120, "Font:66,4,0,4,6"));
        // Irrelevant and malformed prints are skipped.
        log.append(Request::print(130, "hello"));
        log.append(Request::print(140, "Font:bad,0,0"));

        let font = build_font(&log).unwrap().expect("glyphs present");
        assert_eq!((font.width, font.height), (4, 6));
        assert_eq!(font.glyphs.len(), 2);
        assert_eq!(font.glyphs[&65], glyph_screen().region(0, 0, 4, 6));
        assert_eq!(font.glyphs[&66], glyph_screen().region(4, 0, 4, 6));
    }

    #[test]
    fn marker_before_any_screen_is_ignored() {
        let mut log = RequestLog::new();
        log.append(Request::print(10, "Font:65,0,0,4,6"));
        assert!(build_font(&log).unwrap().is_none());
    }

    #[test]
    fn mixed_shapes_error() {
        let mut log = RequestLog::new();
        log.append(Request::screen(100, glyph_screen()));
        log.append(Request::print(110, "Font:65,0,0,4,6"));
        log.append(Request::print(120, "Font:66,0,0,5,6"));
        assert!(matches!(
            build_font(&log),
            Err(FontError::MixedShapes(4, 6, 5, 6))
        ));
    }
}

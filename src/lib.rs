//! RetroPaint — a small raster-paint application in the spirit of the
//! Windows 95 era: freehand strokes, grid-snapped pixels, straight lines and
//! text annotations on a single white canvas, persisted as a flat CSV list
//! of colored pixels.

pub mod app;
pub mod brush;
pub mod canvas;
pub mod cli;
pub mod colors;
pub mod io;
pub mod logger;
pub mod text;

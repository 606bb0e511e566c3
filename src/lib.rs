//! FlyerFE: a single-document editor for retail promotional flyers.
//!
//! The crate is the editing core. A host draws [`editor::Editor::document`],
//! forwards pointer and wheel events to [`editor::Editor::handle_input`], and
//! calls [`editor::Editor::poll_jobs`] and [`editor::Editor::tick`] once per
//! frame. Generation services, rendering and page output plug in through the
//! traits in [`ops::ai`] and [`ops::export`].

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;

pub mod autosave;
pub mod cli;
pub mod components;
pub mod document;
pub mod editor;
pub mod image_handle;
pub mod io;
pub mod ops;
pub mod settings;

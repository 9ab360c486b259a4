//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod attr;
pub mod cache;
pub mod da_info;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod lifecycle;
pub mod message;
pub mod scope;
pub mod service;
pub mod tasks;
pub mod url;

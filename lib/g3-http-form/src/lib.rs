/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! HTTP form request bodies as content providers.

mod config;
pub use config::MultipartConfig;

mod multipart;
pub use multipart::{MultipartForm, Part};

mod urlencoded;
pub use urlencoded::FormUrlencoded;

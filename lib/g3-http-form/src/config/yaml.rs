/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::MultipartConfig;

impl MultipartConfig {
    pub fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match k.to_lowercase().replace('-', "_").as_str() {
            "prefix" | "boundary_prefix" => match v {
                Yaml::String(s) => {
                    self.set_prefix(s.to_string());
                    Ok(())
                }
                _ => Err(anyhow!("invalid string value for key {k}")),
            },
            "random_len" | "random_length" => {
                let len = match v {
                    Yaml::Integer(i) => usize::try_from(*i)
                        .context(format!("out of range usize value for key {k}"))?,
                    Yaml::String(s) => s
                        .parse::<usize>()
                        .context(format!("invalid usize value for key {k}"))?,
                    _ => return Err(anyhow!("invalid usize value for key {k}")),
                };
                self.set_random_len(len);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {}", k)),
        }
    }
}

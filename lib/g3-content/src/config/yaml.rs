/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use humanize_rs::bytes::Bytes as HumanBytes;
use yaml_rust::Yaml;

use super::ReadSourceConfig;

fn as_humanize_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<HumanBytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}

impl ReadSourceConfig {
    pub fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match k.to_lowercase().replace('-', "_").as_str() {
            "buffer_size" | "chunk_size" => {
                let size = as_humanize_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                self.set_buffer_size(size);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {}", k)),
        }
    }

    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            return Err(anyhow!(
                "yaml value type for 'read source config' should be 'map'"
            ));
        };

        let mut config = ReadSourceConfig::default();
        for (k, v) in map.iter() {
            let Yaml::String(k) = k else {
                return Err(anyhow!("yaml map key should be 'string'"));
            };
            config
                .set_by_yaml_kv(k, v)
                .context(format!("failed to parse read source config key {k}"))?;
        }
        Ok(config)
    }
}

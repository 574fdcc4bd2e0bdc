// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Data structures required for `FileResponseHandler` configuration

use clap::Parser;
use log::trace;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorType};

/// Command line options of the file response module
#[derive(Debug, Default, Parser)]
pub struct FileResponseOpt {
    /// The root directory.
    #[clap(short, long)]
    pub root: Option<PathBuf>,

    /// URI path prefix the files are served under, e.g. /static
    #[clap(long)]
    pub request_path: Option<String>,

    /// Serve files with unknown extensions, using the default content type.
    #[clap(long)]
    pub serve_unknown_file_types: Option<bool>,

    /// Content type to use for files with unknown extensions.
    #[clap(long)]
    pub default_content_type: Option<String>,
}

/// Configuration file settings of the file response module
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileResponseConf {
    /// The root directory.
    pub root: Option<PathBuf>,

    /// URI path prefix the files are served under, e.g. /static
    pub request_path: String,

    /// If `true`, files with unknown extensions are served using the default content type.
    /// Otherwise such requests are left to the next handler.
    pub serve_unknown_file_types: bool,

    /// Content type to use for files with unknown extensions, no `Content-Type` header will be
    /// sent if this isn’t set.
    pub default_content_type: Option<String>,

    /// Additional mappings of file extensions (without the dot) to MIME types, taking precedence
    /// over the built-in list.
    pub content_types: HashMap<String, String>,
}

impl FileResponseConf {
    /// Parses configuration from a YAML string.
    pub fn from_yaml(yaml: impl AsRef<str>) -> Result<Self, Box<Error>> {
        let conf = serde_yaml::from_str(yaml.as_ref()).map_err(|err| {
            Error::because(ErrorType::ConfigError, "failed parsing configuration", err)
        })?;
        trace!("Parsed configuration: {conf:#?}");
        Ok(conf)
    }

    /// Loads configuration from a YAML file.
    pub fn load_from_yaml(path: impl AsRef<Path>) -> Result<Self, Box<Error>> {
        let file = File::open(path.as_ref()).map_err(|err| {
            Error::because(
                ErrorType::ConfigError,
                "failed opening configuration file",
                err,
            )
        })?;
        let reader = BufReader::new(file);

        let conf = serde_yaml::from_reader(reader).map_err(|err| {
            Error::because(
                ErrorType::ConfigError,
                "failed reading configuration file",
                err,
            )
        })?;
        trace!("Loaded configuration file: {conf:#?}");

        Ok(conf)
    }

    /// Merges the command line options into the current configuration. Any command line options
    /// present overwrite existing settings.
    pub fn merge_with_opt(&mut self, opt: FileResponseOpt) {
        if opt.root.is_some() {
            self.root = opt.root;
        }

        if let Some(request_path) = opt.request_path {
            self.request_path = request_path;
        }

        if let Some(serve_unknown_file_types) = opt.serve_unknown_file_types {
            self.serve_unknown_file_types = serve_unknown_file_types;
        }

        if opt.default_content_type.is_some() {
            self.default_content_type = opt.default_content_type;
        }
    }
}

// Copyright 2026 memento Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// In-memory cache map error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operation is deliberately not offered by the map.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// Config error.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a config error with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// In-memory cache map result.
pub type Result<T> = std::result::Result<T, Error>;

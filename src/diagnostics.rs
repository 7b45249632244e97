// Copyright 2025 Google LLC
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

/// Sink for human-readable failure messages. Every public operation clears
/// the sink on entry, so a message always belongs to the most recent call.
/// The error taxonomy itself travels in [`crate::GainMapResult`]; this type
/// only carries text.
#[derive(Debug, Default)]
pub struct Diagnostics {
    message: String,
}

impl Diagnostics {
    pub(crate) fn clear(&mut self) {
        self.message.clear();
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.message = message;
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_error(&self) -> bool {
        !self.message.is_empty()
    }
}

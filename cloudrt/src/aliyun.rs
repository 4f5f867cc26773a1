// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Aliyun ECS support with convenience APIs.

pub use cloudrt_aliyun_ecs::*;

#[cfg(feature = "default-context")]
use crate::{default_context, Result};

/// Create an ECS client from the process env.
///
/// This function uses:
/// - [`default_context`] for transport and env
/// - [`Config::from_env`] for endpoint, credentials and polling budget
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> cloudrt::Result<()> {
/// use cloudrt::JobHandle;
///
/// let client = cloudrt::aliyun::default_client()?;
/// client
///     .wait_for_task("cn-hangzhou", &JobHandle::new("t-bp1dm1n7q5ak1aj3k0vq"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "default-context")]
pub fn default_client() -> Result<Client> {
    let ctx = default_context();
    let config = Config::default().from_env(&ctx)?;
    Client::new(ctx, config)
}

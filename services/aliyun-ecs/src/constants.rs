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

// Env values used by the aliyun ecs services.
pub const ALIBABA_CLOUD_ACCESS_KEY_ID: &str = "ALIBABA_CLOUD_ACCESS_KEY_ID";
pub const ALIBABA_CLOUD_ACCESS_KEY_SECRET: &str = "ALIBABA_CLOUD_ACCESS_KEY_SECRET";
pub const ALIBABA_CLOUD_SECURITY_TOKEN: &str = "ALIBABA_CLOUD_SECURITY_TOKEN";
pub const ALIBABA_CLOUD_ECS_ENDPOINT: &str = "ALIBABA_CLOUD_ECS_ENDPOINT";
pub const CLOUDRT_SESSION_INTERVAL: &str = "CLOUDRT_SESSION_INTERVAL";
pub const CLOUDRT_POLL_INTERVAL: &str = "CLOUDRT_POLL_INTERVAL";
pub const CLOUDRT_POLL_MAX_ATTEMPTS: &str = "CLOUDRT_POLL_MAX_ATTEMPTS";

// Defaults.
pub const DEFAULT_ENDPOINT: &str = "https://ecs.aliyuncs.com/";
pub const DEFAULT_API_VERSION: &str = "2014-05-26";
pub const DEFAULT_FORMAT: &str = "JSON";
pub const DEFAULT_SESSION_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 1200;

// Protocol parameters injected by the signer.
pub const FORMAT: &str = "Format";
pub const VERSION: &str = "Version";
pub const ACCESS_KEY_ID: &str = "AccessKeyId";
pub const SIGNATURE_NONCE: &str = "SignatureNonce";
pub const TIMESTAMP: &str = "Timestamp";
pub const SIGNATURE_METHOD: &str = "SignatureMethod";
pub const SIGNATURE_VERSION: &str = "SignatureVersion";
pub const SECURITY_TOKEN: &str = "SecurityToken";
pub const SIGNATURE: &str = "Signature";

pub const HMAC_SHA1: &str = "HMAC-SHA1";
pub const SIGNATURE_VERSION_1_0: &str = "1.0";

// Request parameters.
pub const ACTION: &str = "Action";
pub const REGION_ID: &str = "RegionId";
pub const TASK_ID: &str = "TaskId";
pub const SECURITY_GROUP_NAME: &str = "SecurityGroupName";
pub const KEY_PAIR_NAME: &str = "KeyPairName";

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// A complete descriptor for a containerized deployment with an external database.
pub const CONTAINER_DESCRIPTOR: &str = r#"
# External URL for accessing the platform
external_url 'http://gitlab-infra.apps.example.internal'

# Nginx settings
nginx['enable'] = true
nginx['redirect_http_to_https'] = false
nginx['listen_https'] = false

# Web service settings
gitlab_rails['gitlab_shell_ssh_port'] = 0
gitlab_shell['enable'] = false
gitlab_rails['webservice_external_port'] = 80
gitlab_rails['gitlab_shell_ssh_path'] = '/bin/false'
gitlab_rails['ssh_host_rsa_key'] = '/dev/null'
gitlab_rails['ssh_host_dss_key'] = '/dev/null'
gitlab_rails['ssh_host_ecdsa_key'] = '/dev/null'
gitlab_rails['ssh_host_ed25519_key'] = '/dev/null'
runit['svlogd_bin'] = '/bin/false'
runit['chpst_bin'] = '/bin/false'
gitlab_rails['security_context'] = {
  'runAsUser' => 1000,
  'runAsGroup' => 1000,
  'fsGroup' => 1000
}

openssh['enable'] = false
service['sshd'] = false

# Persistence
gitaly['persistence'] = true
gitaly['storage_class'] = 'standard'  # adjust to the cluster
gitaly['security_context'] = {
  'runAsUser' => 1000,
  'runAsGroup' => 1000,
  'fsGroup' => 1000
}

gitlab_shell['service'] = {
  'securityContext' => {
    'runAsUser' => 1000,
    'runAsGroup' => 1000,
    'fsGroup' => 1000
  }
}

# Cache
redis['enable'] = true
redis['master']['enable'] = true
redis['replica']['enable'] = false

# External database
postgresql['enable'] = false
gitlab_rails['db_adapter'] = 'postgresql'
gitlab_rails['db_host'] = 'gitlab-postgresql'
gitlab_rails['db_port'] = 5432
gitlab_rails['db_username'] = 'gitlab'
gitlab_rails['db_password'] = 'gitlab'
gitlab_rails['db_database'] = 'gitlab'

prometheus['enable'] = false
registry['enable'] = false
"#;

/// Write `content` to `gitlab.rb` inside a fresh temporary directory.
///
/// The directory is removed when the returned guard drops.
pub fn write_temp_descriptor(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gitlab.rb");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
